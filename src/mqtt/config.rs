use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MqttConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Client certificate and key must be set together")]
    IncompleteClientAuth,

    #[error("Client certificate requires ca_path")]
    MissingCa,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Root of both the gesture topics and the raw edge topics
    pub topic_prefix: String,
    pub keep_alive_secs: u64,
    /// PEM CA bundle. Setting it switches the connection to TLS.
    pub ca_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "pico-bridge".to_string(),
            username: None,
            password: None,
            topic_prefix: "pico".to_string(),
            keep_alive_secs: 5,
            ca_path: None,
            client_cert_path: None,
            client_key_path: None,
        }
    }
}

/// PEM material for a TLS broker connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsMaterial {
    pub ca: Vec<u8>,
    /// Certificate and key for client authentication
    pub client_auth: Option<(Vec<u8>, Vec<u8>)>,
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn validate(&self) -> Result<(), MqttConfigError> {
        match (&self.client_cert_path, &self.client_key_path) {
            (Some(_), None) | (None, Some(_)) => Err(MqttConfigError::IncompleteClientAuth),
            (Some(_), Some(_)) if self.ca_path.is_none() => Err(MqttConfigError::MissingCa),
            _ => Ok(()),
        }
    }

    /// Reads the configured PEM files. `None` means a plaintext connection.
    pub async fn load_tls(&self) -> Result<Option<TlsMaterial>, MqttConfigError> {
        self.validate()?;
        let Some(ca_path) = &self.ca_path else {
            return Ok(None);
        };
        let ca = read_pem(ca_path).await?;
        let client_auth = match (&self.client_cert_path, &self.client_key_path) {
            (Some(cert), Some(key)) => Some((read_pem(cert).await?, read_pem(key).await?)),
            _ => None,
        };
        Ok(Some(TlsMaterial { ca, client_auth }))
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, MqttConfigError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| MqttConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
}
