pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "withholding")]
pub mod withholding;

pub use config::EngineConfig;
pub use error::{ErrorKind, RetencionError};
pub use types::*;

/// Standard result type for all withholding operations
pub type RetencionResult<T> = Result<T, RetencionError>;
