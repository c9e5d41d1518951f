use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::uploads::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub token_ttl_hours: i64,
    pub remember_me_days: i64,
    /// Base URL of the wellness survey service. Wellness lookups are
    /// reported as unavailable when unset.
    pub wellness_base_url: Option<String>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        if self.token_ttl_hours <= 0 || self.remember_me_days <= 0 {
            return Err(Error::Config("token lifetimes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("clubhouse.db")
    }

    #[must_use]
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(".jwt_secret")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            token_ttl_hours: 24,
            remember_me_days: 7,
            wellness_base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clubhouse.toml");
        fs::write(
            &path,
            "port = 9090\nwellness_base_url = \"http://wellness.local\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.wellness_base_url.as_deref(), Some("http://wellness.local"));
        assert_eq!(config.db_path(), PathBuf::from("./data/clubhouse.db"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clubhouse.toml");
        fs::write(&path, "token_ttl_hours = 0\n").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(Error::Config(_))));

        fs::write(&path, "port = \"eighty\"\n").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(Error::Config(_))));
    }
}
