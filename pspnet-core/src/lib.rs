//! # PSPNet Core
//!
//! Configuration schema for the PSPNet segmentation training pipeline.
//! Provides the dataset and hyperparameter records, type-checked overrides,
//! layered loading from files and environment, and the error types.

mod coerce;
pub mod config;
pub mod error;

// Re-export commonly used types at the crate root.
pub use config::{
    DatasetConfig, HyperParameters, TrainingConfig, config_exists, load_config,
    write_default_config,
};
pub use error::{ConfigError, PspnetError, Result, ValidationError};
