pub mod normalize;

pub use normalize::{normalize, significant_tokens};
