use std::path::PathBuf;

use config::{Config, Environment, File};

use crate::config::AppConfig;

impl AppConfig {
    /// Load configuration from multiple sources in order of precedence:
    /// 1. built-in defaults
    /// 2. `<data_dir>/config.toml` (optional)
    /// 3. environment variables with the RSMARK_ prefix
    ///
    /// The data root itself comes from `$RSMARK_HOME`, else the platform
    /// data directory.
    pub fn load() -> anyhow::Result<Self> {
        let data_dir = Self::resolve_data_dir()?;
        Self::load_from(data_dir)
    }

    pub fn load_from(data_dir: PathBuf) -> anyhow::Result<Self> {
        let config_file = data_dir.join("config.toml");

        let builder = Config::builder()
            .add_source(File::from(config_file).required(false))
            .add_source(Environment::with_prefix("RSMARK").separator("__"));

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        if app_config.data_dir.as_os_str().is_empty() {
            app_config.data_dir = data_dir;
        }
        if app_config.editor.is_none() {
            app_config.editor = std::env::var("RSMARK_EDITOR").ok();
        }

        Ok(app_config)
    }

    fn resolve_data_dir() -> anyhow::Result<PathBuf> {
        if let Ok(home) = std::env::var("RSMARK_HOME") {
            return Ok(PathBuf::from(home));
        }
        dirs::data_dir()
            .map(|d| d.join("rsmark"))
            .ok_or_else(|| anyhow::anyhow!("no data directory on this platform"))
    }
}
