//! INI file configuration adapter.
//!
//! Section and key names are case-sensitive so `[dividends]` entries keep their ticker spelling.

use crate::domain::error::NestcastError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NestcastError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|reason| NestcastError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, NestcastError> {
        Self::parse(content).map_err(|reason| NestcastError::ConfigParse {
            file: "<string>".to_string(),
            reason,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        let mut config = Ini::new_cs();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(section)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
