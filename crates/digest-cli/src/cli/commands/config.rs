//! Config command handlers.

use anyhow::{Context, Result};
use digest_core::config::{self, Config};

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn show(config: &Config) -> Result<()> {
    let toml = config.to_toml().context("serialize config")?;
    print!("{toml}");
    let base_url = config.effective_base_url().context("resolve base URL")?;
    if base_url != config.base_url.trim_end_matches('/') {
        println!("# {} overrides base_url: {base_url}", config::BASE_URL_ENV);
    }
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let config_path = config::paths::config_path();
    Config::set_value(&config_path, key, value)
        .with_context(|| format!("set {key} in {}", config_path.display()))?;
    println!("Set {key} = {value}");
    Ok(())
}
