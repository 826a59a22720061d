pub mod error;
pub mod types;

#[cfg(feature = "corporate_tax")]
pub mod corporate_tax;

#[cfg(feature = "cooperative")]
pub mod cooperative;

#[cfg(feature = "sensitivity")]
pub mod scenarios;

pub use error::SimulatorError;
pub use types::*;

/// Standard result type for all simulator operations
pub type SimulatorResult<T> = Result<T, SimulatorError>;
