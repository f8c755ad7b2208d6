mod types;

pub use types::{AppError, ReconcileError, RemoteError};

pub type Result<T> = std::result::Result<T, AppError>;
