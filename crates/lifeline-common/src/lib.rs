pub mod errors;

pub use errors::{ConfigError, LifelineError};

pub type Result<T> = std::result::Result<T, LifelineError>;
