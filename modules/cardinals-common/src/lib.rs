pub mod config;
pub mod error;
pub mod types;

pub use config::{load_config, load_or_default, FileConfig, HarvestConfig, Secrets};
pub use error::CardinalsError;
pub use types::*;
