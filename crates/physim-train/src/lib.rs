pub mod checkpoint;
pub mod config;
pub mod error;
pub mod optimization;

pub use config::UNetConfig;
pub use error::{Result, TrainError};
pub use optimization::Optimization;
