//! Signed credentials: time-bounded Biscuit tokens carrying one identifier.

use crate::error::TokenError;
use crate::keys::KeyPair;
use biscuit_auth::builder::AuthorizerBuilder;
use biscuit_auth::macros::{check, fact};
use biscuit_auth::{Authorizer, Biscuit, PublicKey};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A freshly signed credential.
#[derive(Debug, Clone)]
pub struct SignedCredential {
    /// Base64 Biscuit, as sent over the wire.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs credentials with the private key.
pub struct CredentialSigner {
    keypair: KeyPair,
}

impl CredentialSigner {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    /// Sign a credential whose only claim is `identifier`, valid for `ttl`.
    pub fn sign(&self, identifier: &str, ttl: Duration) -> Result<SignedCredential, TokenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenError::CredentialCreationFailed(e.to_string()))?;
        let expires_at = Utc::now() + ttl;

        let biscuit = Biscuit::builder()
            .fact(fact!("identifier({identifier})", identifier = identifier.to_string()))
            .map_err(|e| TokenError::CredentialCreationFailed(e.to_string()))?
            .check(check!(
                "check if time($time), $time < {expires_at}",
                expires_at = expires_at.timestamp()
            ))
            .map_err(|e| TokenError::CredentialCreationFailed(e.to_string()))?
            .build(self.keypair.inner())
            .map_err(|e| TokenError::CredentialCreationFailed(e.to_string()))?;

        let token = biscuit
            .to_base64()
            .map_err(|e| TokenError::CredentialCreationFailed(e.to_string()))?;

        Ok(SignedCredential { token, expires_at })
    }
}

/// Verifies credentials with the public key.
pub struct CredentialVerifier {
    public_key: PublicKey,
}

impl CredentialVerifier {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// Check signature and expiry, then extract the identifier.
    pub fn verify(&self, credential: &str) -> Result<VerifiedCredential, TokenError> {
        let biscuit = self.parse(credential)?;

        let now = Utc::now().timestamp();
        let mut authorizer = AuthorizerBuilder::new()
            .code(format!(
                r#"
                time({now});
                allow if true;
                "#
            ))
            .map_err(|e| TokenError::VerificationFailed(e.to_string()))?
            .build(&biscuit)
            .map_err(|e| TokenError::VerificationFailed(e.to_string()))?;

        authorizer
            .authorize()
            .map_err(|e| TokenError::VerificationFailed(e.to_string()))?;

        extract_identifier(&mut authorizer)
    }

    /// Check the signature only and extract the identifier, ignoring expiry.
    ///
    /// Used when an expired access credential is presented for rotation.
    pub fn inspect(&self, credential: &str) -> Result<VerifiedCredential, TokenError> {
        let biscuit = self.parse(credential)?;

        let mut authorizer = AuthorizerBuilder::new()
            .build(&biscuit)
            .map_err(|e| TokenError::VerificationFailed(e.to_string()))?;

        extract_identifier(&mut authorizer)
    }

    fn parse(&self, credential: &str) -> Result<Biscuit, TokenError> {
        Biscuit::from_base64(credential.trim(), self.public_key.clone())
            .map_err(|e| TokenError::CredentialParseFailed(e.to_string()))
    }
}

/// A credential whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    /// The embedded secured token.
    pub identifier: String,
}

fn extract_identifier(authorizer: &mut Authorizer) -> Result<VerifiedCredential, TokenError> {
    let results: Vec<(String,)> = authorizer
        .query("data($i) <- identifier($i)")
        .map_err(|e| TokenError::VerificationFailed(e.to_string()))?;

    results
        .into_iter()
        .next()
        .map(|(identifier,)| VerifiedCredential { identifier })
        .ok_or_else(|| TokenError::MissingClaim {
            claim: "identifier".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (CredentialSigner, CredentialVerifier) {
        let keypair = KeyPair::generate().unwrap();
        let verifier = CredentialVerifier::new(keypair.public_key());
        (CredentialSigner::new(keypair), verifier)
    }

    #[test]
    fn test_sign_and_verify() {
        let (signer, verifier) = pair();

        let signed = signer.sign("abc123", Duration::from_secs(60)).unwrap();
        assert!(signed.expires_at > Utc::now());

        let verified = verifier.verify(&signed.token).unwrap();
        assert_eq!(verified.identifier, "abc123");
    }

    #[test]
    fn test_expired_credential_fails_verify_but_inspects() {
        let (signer, verifier) = pair();

        let signed = signer.sign("abc123", Duration::ZERO).unwrap();
        assert!(matches!(
            verifier.verify(&signed.token),
            Err(TokenError::VerificationFailed(_))
        ));

        let inspected = verifier.inspect(&signed.token).unwrap();
        assert_eq!(inspected.identifier, "abc123");
    }

    #[test]
    fn test_foreign_key_rejected() {
        let (signer, _) = pair();
        let (_, other_verifier) = pair();

        let signed = signer.sign("abc123", Duration::from_secs(60)).unwrap();
        assert!(matches!(
            other_verifier.verify(&signed.token),
            Err(TokenError::CredentialParseFailed(_))
        ));
        assert!(matches!(
            other_verifier.inspect(&signed.token),
            Err(TokenError::CredentialParseFailed(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let (_, verifier) = pair();
        assert!(matches!(
            verifier.verify("definitely-not-a-biscuit"),
            Err(TokenError::CredentialParseFailed(_))
        ));
    }
}
