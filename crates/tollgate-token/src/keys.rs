//! Ed25519 keypairs for signing and verifying credentials.

use crate::error::TokenError;
use biscuit_auth::{Algorithm, KeyPair as BiscuitKeyPair, PrivateKey, PublicKey};
use rand::RngCore;
use std::path::Path;
use tollgate_core::KeyConfig;

/// An Ed25519 keypair. The private half never leaves the issuing process.
pub struct KeyPair {
    inner: BiscuitKeyPair,
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_private_key(self.inner.private())
    }
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Result<Self, TokenError> {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);

        let private_key = PrivateKey::from_bytes(&bytes, Algorithm::Ed25519)
            .map_err(|e| TokenError::KeyGenerationFailed(e.to_string()))?;

        Ok(Self::from_private_key(private_key))
    }

    fn from_private_key(private_key: PrivateKey) -> Self {
        let inner = BiscuitKeyPair::from(&private_key);
        Self { inner }
    }

    /// Load a keypair from a hex-encoded private key string.
    pub fn from_private_key_hex(hex: &str) -> Result<Self, TokenError> {
        let private_key = PrivateKey::from_bytes_hex(hex, Algorithm::Ed25519)
            .map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_private_key(private_key))
    }

    pub fn inner(&self) -> &BiscuitKeyPair {
        &self.inner
    }

    pub fn public_key(&self) -> PublicKey {
        self.inner.public()
    }

    pub fn private_key_hex(&self) -> String {
        self.inner.private().to_bytes_hex()
    }

    pub fn public_key_hex(&self) -> String {
        self.inner.public().to_bytes_hex()
    }

    /// Save the keypair to files.
    pub fn save_to_files(&self, private_key_path: &Path, public_key_path: &Path) -> Result<(), TokenError> {
        std::fs::write(private_key_path, self.private_key_hex())?;
        std::fs::write(public_key_path, self.public_key_hex())?;
        Ok(())
    }

    /// Resolve the signing keypair and the verification key from configuration.
    ///
    /// A configured public key must match the private key; otherwise every issued
    /// credential would fail verification.
    pub fn from_config(config: &KeyConfig) -> Result<(Self, PublicKey), TokenError> {
        let private_hex = config.resolve_private_key()?.ok_or_else(|| {
            TokenError::InvalidPrivateKey("no private key configured (env or file)".to_string())
        })?;
        let keypair = Self::from_private_key_hex(&private_hex)?;

        let public_key = match config.resolve_public_key()? {
            Some(hex) => {
                let public_key = PublicKey::from_bytes_hex(hex.trim(), Algorithm::Ed25519)
                    .map_err(|e| TokenError::InvalidPublicKey(e.to_string()))?;
                if public_key.to_bytes_hex() != keypair.public_key_hex() {
                    return Err(TokenError::InvalidPublicKey(
                        "public key does not match the private key".to_string(),
                    ));
                }
                public_key
            }
            None => keypair.public_key(),
        };

        Ok((keypair, public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_keypair_roundtrip() {
        let keypair1 = KeyPair::generate().unwrap();
        let hex = keypair1.private_key_hex();

        let keypair2 = KeyPair::from_private_key_hex(&hex).unwrap();
        assert_eq!(keypair1.public_key_hex(), keypair2.public_key_hex());
    }

    #[test]
    fn test_saved_files_load_through_config() {
        let keypair = KeyPair::generate().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let private_path = dir.path().join("private.key");
        let public_path = dir.path().join("public.key");

        keypair.save_to_files(&private_path, &public_path).unwrap();

        let config = KeyConfig {
            private_key_env: None,
            private_key_file: Some(private_path),
            public_key_env: None,
            public_key_file: Some(public_path),
        };
        let (loaded, public_key) = KeyPair::from_config(&config).unwrap();
        assert_eq!(loaded.public_key_hex(), keypair.public_key_hex());
        assert_eq!(public_key.to_bytes_hex(), keypair.public_key_hex());
    }

    #[test]
    fn test_from_config_derives_public_key() {
        let keypair = KeyPair::generate().unwrap();
        let mut priv_file = NamedTempFile::new().unwrap();
        writeln!(priv_file, "{}", keypair.private_key_hex()).unwrap();

        let config = KeyConfig {
            private_key_env: None,
            private_key_file: Some(priv_file.path().to_path_buf()),
            public_key_env: None,
            public_key_file: None,
        };
        let (loaded, public_key) = KeyPair::from_config(&config).unwrap();
        assert_eq!(loaded.public_key_hex(), keypair.public_key_hex());
        assert_eq!(public_key.to_bytes_hex(), keypair.public_key_hex());
    }

    #[test]
    fn test_from_config_rejects_mismatched_public_key() {
        let keypair = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let mut priv_file = NamedTempFile::new().unwrap();
        let mut pub_file = NamedTempFile::new().unwrap();
        writeln!(priv_file, "{}", keypair.private_key_hex()).unwrap();
        writeln!(pub_file, "{}", other.public_key_hex()).unwrap();

        let config = KeyConfig {
            private_key_env: None,
            private_key_file: Some(priv_file.path().to_path_buf()),
            public_key_env: None,
            public_key_file: Some(pub_file.path().to_path_buf()),
        };
        assert!(matches!(
            KeyPair::from_config(&config),
            Err(TokenError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_from_config_without_private_key() {
        let config = KeyConfig {
            private_key_env: None,
            private_key_file: None,
            public_key_env: None,
            public_key_file: None,
        };
        assert!(matches!(
            KeyPair::from_config(&config),
            Err(TokenError::InvalidPrivateKey(_))
        ));
    }
}
