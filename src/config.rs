use serde::Deserialize;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub alpha: f64,
    pub min_df: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Read `config.toml` from the working directory; every key has a default
    /// so a missing file or section still produces a usable configuration.
    pub fn new() -> Result<Self, ConfigError> {
        let builder: ConfigBuilder<DefaultState> = ConfigBuilder::<DefaultState>::default()
            .set_default("model.path", "model.json")?
            .set_default("model.alpha", 1.0)?
            .set_default("model.min_df", 1)?
            .set_default("server.address", "127.0.0.1:9002")?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config").required(false));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
