//! Process-scoped dependencies shared by every engine component.

use crate::error::SessionError;
use crate::registry::{MemoryRegistry, SessionRegistry};
use crate::store::{SessionStore, SqliteSessionStore};
use std::sync::Arc;
use tollgate_core::{Lifetimes, SessionConfig};
use tollgate_token::{CredentialSigner, CredentialVerifier, KeyPair, PayloadCodec, PublicKey};

/// Handles acquired at startup and injected into each component.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct SessionContext {
    pub codec: Arc<PayloadCodec>,
    pub signer: Arc<CredentialSigner>,
    pub verifier: Arc<CredentialVerifier>,
    pub registry: Arc<dyn SessionRegistry>,
    pub store: Arc<dyn SessionStore>,
    pub lifetimes: Lifetimes,
    pub roles: Arc<[String]>,
}

impl SessionContext {
    pub fn new(
        codec: PayloadCodec,
        keypair: KeyPair,
        public_key: PublicKey,
        registry: Arc<dyn SessionRegistry>,
        store: Arc<dyn SessionStore>,
        lifetimes: Lifetimes,
        roles: Vec<String>,
    ) -> Self {
        Self {
            codec: Arc::new(codec),
            signer: Arc::new(CredentialSigner::new(keypair)),
            verifier: Arc::new(CredentialVerifier::new(public_key)),
            registry,
            store,
            lifetimes,
            roles: roles.into(),
        }
    }

    /// Context with throwaway keys, an in-memory registry and an in-memory SQLite
    /// store. Nothing survives the process.
    pub async fn ephemeral(config: &SessionConfig) -> Result<Self, SessionError> {
        let keypair = KeyPair::generate()?;
        let public_key = keypair.public_key();
        let codec = PayloadCodec::from_key_hex(&PayloadCodec::generate_key_hex())?;
        let store = SqliteSessionStore::in_memory().await?;

        Ok(Self::new(
            codec,
            keypair,
            public_key,
            Arc::new(MemoryRegistry::new()),
            Arc::new(store),
            config.lifetimes()?,
            config.roles.clone(),
        ))
    }

    pub fn is_role_allowed(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
