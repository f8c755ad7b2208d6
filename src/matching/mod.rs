pub mod engine;
pub mod verse;

pub use engine::{route_pool, similarity, MatchEngine, Pools};
pub use verse::match_verse;
