//! # tollgate-session
//!
//! Multi-device session lifecycle engine.
//!
//! A subject may hold any number of concurrent sessions, one per logged-in device.
//! Each session is an access credential whose embedded identifier is listed in the
//! subject's registry list; the paired refresh credential is recorded in the durable
//! store and can be exchanged exactly once for a new pair.
//!
//! ## Components
//!
//! - [`TokenIssuer`]: stamps, encrypts and signs payloads; registers access sessions
//! - [`VerificationPipeline`]: accepts an access credential iff it is live
//! - [`RevocationEngine`]: single, bulk and all-but-current logout; rotation
//! - [`list_sessions`]: what a subject sees in its device list
//! - [`SessionManager`]: façade over all of the above
//!
//! ## Example
//!
//! ```ignore
//! use tollgate_core::{PrincipalPayload, SessionConfig};
//! use tollgate_session::{SessionContext, SessionManager};
//!
//! let config = SessionConfig::default();
//! let manager = SessionManager::new(SessionContext::ephemeral(&config).await?, config.default_role);
//!
//! let pair = manager.login(PrincipalPayload::new("u1").with_device("cli"), false, None).await?;
//! let principal = manager.authenticate(&pair.access_token).await?;
//! manager.logout(&principal).await?;
//! ```

pub mod account;
pub mod context;
pub mod error;
pub mod issuer;
pub mod manager;
pub mod registry;
pub mod revoke;
pub mod sessions;
pub mod store;
pub mod sweeper;
pub mod verify;

pub use context::SessionContext;
pub use error::{RejectReason, Rejected, SessionError};
pub use issuer::{IssuedCredential, TokenIssuer, TokenPair};
pub use manager::SessionManager;
pub use registry::{MemoryRegistry, SessionRegistry};
pub use revoke::RevocationEngine;
pub use sessions::{ActiveSession, list_sessions};
pub use store::{RecordMatcher, SessionRecord, SessionStore, SqliteSessionStore};
pub use sweeper::{SweepReport, spawn_sweeper, sweep_once};
pub use verify::{Principal, VerificationPipeline};
