pub mod debt;
pub mod equity;
pub mod error;
pub mod types;
pub mod wacc;

#[cfg(feature = "instruments")]
pub mod instruments;

pub use error::WaccError;
pub use types::*;

/// Standard result type for all WACC operations
pub type WaccResult<T> = Result<T, WaccError>;
