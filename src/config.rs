use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub concurrency: usize,
    pub openai: OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAi {
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 10,
            openai: OpenAi::default(),
        }
    }
}

impl Default for OpenAi {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }
}

pub fn load_config() -> Result<Config> {
    let path = PathBuf::from("locsmith.toml");
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("Reading config file {:?}", path))?;
    let cfg: Config =
        toml::from_str(&contents).with_context(|| format!("Parsing config file {:?}", path))?;
    Ok(cfg)
}
