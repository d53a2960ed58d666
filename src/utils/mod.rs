/// TOML configuration (`aivo.toml`) and its validation.
pub mod toml_config;

pub use toml_config::{AivoConfig, ConfigError, ParallelFailurePolicy};
