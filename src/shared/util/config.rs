//! Loads config from config.toml

use crate::shared::error::{Error, Result};

use serde_derive::Deserialize;
use cached::proc_macro::cached;
use std::env;
use std::fs;
use std::path::Path;
use std::process::exit;
use toml;

pub const CONFIG_ENV: &str = "SWGBUDDY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: bool
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub base_url: String,
    // Request-origin header on writes, `base_url` when unset
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default = "default_server")]
    pub default_server: String
}

impl ServerConfig {
    pub fn origin(&self) -> &str {
        self.origin.as_deref().unwrap_or(self.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig { poll_interval_seconds: default_poll_interval(), page_size: default_page_size() }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { path: default_store_path() }
    }
}

fn default_server() -> String { "cuemu".to_string() }
fn default_poll_interval() -> u64 { 60 }
fn default_page_size() -> usize { 25 }
fn default_store_path() -> String { "client-store.json".to_string() }

pub fn config_path() -> String {
    env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Could not read {}: {}", path.display(), e)))?;
    parse_config(&contents)
}

#[cached]
pub fn get_config() -> Config {
    let path = config_path();
    match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Unable to load {}, please create or ensure it's accessible ({})", path, err);
            exit(1);
        }
    }
}
