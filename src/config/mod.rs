// Configuration management module
// TOML configuration file, validation, environment overrides and display

pub mod display;
pub mod settings;

pub use display::{init_config, show_config};
pub use settings::{
    Config, ConfigError, EmbedderBackend, HashingConfig, OllamaConfig, RetrievalConfig,
};
