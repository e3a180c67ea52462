//! Payload codec: structured payload <-> opaque secured token.
//!
//! Format: `hex(nonce || AES-256-GCM(json(payload + {"_": salt})))`.
//!
//! Every encode draws a fresh nonce and a fresh salt, so two secured tokens are never
//! equal even for identical payloads. The salt field name `_` is reserved.

use crate::error::TokenError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tollgate_core::CryptoConfig;

/// Nonce size for AES-256-GCM (12 bytes / 96 bits).
const NONCE_SIZE: usize = 12;

/// Bytes of randomness injected into each payload before encryption.
const SALT_BYTES: usize = 16;

/// Name of the injected salt field.
const SALT_FIELD: &str = "_";

/// Symmetric codec for principal payloads.
#[derive(Clone)]
pub struct PayloadCodec {
    cipher: Aes256Gcm,
}

impl PayloadCodec {
    /// Create a codec from a raw 256-bit key.
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&Key::<Aes256Gcm>::from(key)),
        }
    }

    /// Create a codec from a hex-encoded 256-bit key.
    pub fn from_key_hex(key_hex: &str) -> Result<Self, TokenError> {
        let bytes = hex::decode(key_hex.trim()).map_err(|e| TokenError::InvalidPayloadKey(e.to_string()))?;
        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            TokenError::InvalidPayloadKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::new(key))
    }

    /// Build the codec from the configured key source. The key is mandatory.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, TokenError> {
        let key_hex = config.resolve_payload_key()?.ok_or_else(|| {
            TokenError::InvalidPayloadKey("no payload key configured (env or file)".to_string())
        })?;
        Self::from_key_hex(&key_hex)
    }

    /// Generate a random hex-encoded payload key.
    pub fn generate_key_hex() -> String {
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        hex::encode(key)
    }

    /// Encrypt a payload into a secured token.
    pub fn encode<T: Serialize>(&self, payload: &T) -> Result<String, TokenError> {
        let mut value = serde_json::to_value(payload).map_err(|e| TokenError::EncodeFailed(e.to_string()))?;
        let Value::Object(fields) = &mut value else {
            return Err(TokenError::EncodeFailed(
                "payload must serialize to a JSON object".to_string(),
            ));
        };

        let mut salt = [0u8; SALT_BYTES];
        rand::rng().fill_bytes(&mut salt);
        fields.insert(SALT_FIELD.to_string(), Value::String(hex::encode(salt)));

        let plaintext = serde_json::to_vec(&value).map_err(|e| TokenError::EncodeFailed(e.to_string()))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|e| TokenError::EncodeFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(hex::encode(combined))
    }

    /// Decrypt a secured token back into its payload, dropping the salt.
    ///
    /// Every failure is reported as [`TokenError::DecodeFailed`]; the reason is only
    /// logged, never returned.
    pub fn decode<T: DeserializeOwned>(&self, secured_token: &str) -> Result<T, TokenError> {
        let combined = hex::decode(secured_token).map_err(|e| reject("hex", e))?;
        if combined.len() <= NONCE_SIZE {
            return Err(reject("length", "secured token too short"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.try_into().map_err(|e| reject("nonce", e))?;
        let plaintext = self
            .cipher
            .decrypt(&Nonce::from(nonce), ciphertext)
            .map_err(|e| reject("cipher", e))?;

        let mut value: Value = serde_json::from_slice(&plaintext).map_err(|e| reject("json", e))?;
        match &mut value {
            Value::Object(fields) => {
                fields.remove(SALT_FIELD);
            }
            _ => return Err(reject("json", "plaintext is not an object")),
        }

        serde_json::from_value(value).map_err(|e| reject("payload", e))
    }
}

fn reject(stage: &'static str, reason: impl std::fmt::Display) -> TokenError {
    tracing::debug!(stage, reason = %reason, "Secured token rejected");
    TokenError::DecodeFailed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::{PrincipalPayload, TokenType};

    fn codec() -> PayloadCodec {
        PayloadCodec::from_key_hex(&PayloadCodec::generate_key_hex()).unwrap()
    }

    fn sample_payload() -> PrincipalPayload {
        let mut payload = PrincipalPayload::new("u1")
            .with_email("ada@example.com")
            .with_device("Mozilla/5.0")
            .with_origin("203.0.113.7");
        payload.token_type = Some(TokenType::Access);
        payload.role = Some("user".to_string());
        payload.iat = 1_700_000_000;
        payload
    }

    #[test]
    fn test_roundtrip_strips_salt() {
        let codec = codec();
        let payload = sample_payload();

        let token = codec.encode(&payload).unwrap();
        let decoded: PrincipalPayload = codec.decode(&token).unwrap();
        assert_eq!(decoded, payload);

        let raw: Value = codec.decode(&token).unwrap();
        assert!(raw.get(SALT_FIELD).is_none());
    }

    #[test]
    fn test_identical_payloads_never_collide() {
        let codec = codec();
        let payload = sample_payload();

        let first = codec.encode(&payload).unwrap();
        let second = codec.encode(&payload).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_tampered_token_fails() {
        let codec = codec();
        let token = codec.encode(&sample_payload()).unwrap();

        // Flip one hex digit inside the ciphertext.
        let mut bytes = token.into_bytes();
        let idx = NONCE_SIZE * 2 + 4;
        bytes[idx] = if bytes[idx] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            codec.decode::<PrincipalPayload>(&tampered),
            Err(TokenError::DecodeFailed)
        ));
    }

    #[test]
    fn test_other_key_fails() {
        let token = codec().encode(&sample_payload()).unwrap();
        assert!(matches!(
            codec().decode::<PrincipalPayload>(&token),
            Err(TokenError::DecodeFailed)
        ));
    }

    #[test]
    fn test_garbage_fails() {
        let codec = codec();
        assert!(matches!(codec.decode::<Value>("not-hex"), Err(TokenError::DecodeFailed)));
        assert!(matches!(codec.decode::<Value>("abcd"), Err(TokenError::DecodeFailed)));
    }

    #[test]
    fn test_non_object_payload_rejected() {
        assert!(matches!(codec().encode(&42), Err(TokenError::EncodeFailed(_))));
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        assert!(matches!(
            PayloadCodec::from_key_hex("abcd"),
            Err(TokenError::InvalidPayloadKey(_))
        ));
        assert!(matches!(
            PayloadCodec::from_key_hex("zz"),
            Err(TokenError::InvalidPayloadKey(_))
        ));
    }
}
