//! ordo-sync: service-order ingestion, fuzzy matching and playlist
//! reconciliation against an external presentation controller.

pub mod config;
pub mod errors;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod reconciler;
pub mod remote;
pub mod segmenter;
pub mod utils;
