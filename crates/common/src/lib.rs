pub mod category;
pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use category::{CategoryTable, UNKNOWN_LABEL};
pub use config::{AppConfig, DistanceMetric, EmbedInput};
pub use error::GiftGuideError;
pub type Result<T> = std::result::Result<T, GiftGuideError>;
