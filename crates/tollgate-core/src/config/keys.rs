//! Payload-key and signing-key configuration.

use super::resolve_secret;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of the symmetric key that encrypts principal payloads.
///
/// The key is 32 bytes, hex-encoded. Rotating it invalidates every outstanding
/// credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Environment variable containing the payload key.
    #[serde(default = "default_payload_key_env")]
    pub payload_key_env: Option<String>,

    /// Path to a file containing the payload key.
    #[serde(default)]
    pub payload_key_file: Option<PathBuf>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            payload_key_env: default_payload_key_env(),
            payload_key_file: None,
        }
    }
}

impl CryptoConfig {
    pub fn resolve_payload_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve_secret(self.payload_key_env.as_deref(), self.payload_key_file.as_deref())
    }
}

fn default_payload_key_env() -> Option<String> {
    Some("TOLLGATE_PAYLOAD_KEY".to_string())
}

/// Source of the Ed25519 keypair that signs and verifies credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Environment variable containing the private key (hex-encoded).
    #[serde(default = "default_private_key_env")]
    pub private_key_env: Option<String>,

    /// Path to the private key file.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    /// Environment variable containing the public key (hex-encoded).
    #[serde(default = "default_public_key_env")]
    pub public_key_env: Option<String>,

    /// Path to the public key file. When no public key is configured it is derived
    /// from the private key.
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
            private_key_file: None,
            public_key_env: default_public_key_env(),
            public_key_file: None,
        }
    }
}

impl KeyConfig {
    pub fn resolve_private_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve_secret(self.private_key_env.as_deref(), self.private_key_file.as_deref())
    }

    pub fn resolve_public_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve_secret(self.public_key_env.as_deref(), self.public_key_file.as_deref())
    }
}

fn default_private_key_env() -> Option<String> {
    Some("TOLLGATE_PRIVATE_KEY".to_string())
}

fn default_public_key_env() -> Option<String> {
    Some("TOLLGATE_PUBLIC_KEY".to_string())
}
