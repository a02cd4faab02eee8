//! Configuration merge system
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (~/.config/ppa-steward/config.toml or --config)
//! 3. Environment (LP_ACCESS_TOKEN, LP_ACCESS_SECRET, LP_SERVICE_ROOT)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, EnvOverrides,
    CONFIG_PATH_ENV,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{
    ArchiveSettings, BuildSettings, CredentialSettings, RetentionSettings, Settings,
    UploadSettings,
};
