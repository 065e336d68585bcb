//! Durable key-value store for client state that outlives a run

use crate::shared::error::Result;

use serde_json::{Map, Value};
use std::fs;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

pub const SERVER_KEY: &str = "swg_server_id";

#[derive(Clone, Debug)]
pub struct ClientStore {
    path: PathBuf
}

impl ClientStore {
    pub fn new(path: impl AsRef<Path>) -> ClientStore {
        ClientStore { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // A missing file is an empty store
    fn read_all(&self) -> Result<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into())
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.get(key).and_then(Value::as_str).map(str::to_string))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), Value::String(value.to_string()));

        let mut file = fs::File::create(&self.path)?;
        file.write_all(serde_json::to_string_pretty(&all)?.as_bytes())?;
        Ok(())
    }

    pub fn last_server(&self) -> Result<Option<String>> {
        self.get(SERVER_KEY)
    }

    pub fn set_last_server(&self, server_id: &str) -> Result<()> {
        self.set(SERVER_KEY, server_id)
    }
}
