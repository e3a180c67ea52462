use crate::{config::AppConfig, users::UserStore};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{fs, path::Path, str::FromStr, sync::Arc};
use tollgate_session::{MemoryRegistry, SessionContext, SessionManager, SqliteSessionStore};
use tollgate_token::{KeyPair, PayloadCodec};

/// Shared application state.
pub struct AppState {
    pub cfg: AppConfig,
    pub db: SqlitePool,
    pub users: UserStore,
    pub sessions: SessionManager,
}

impl AppState {
    /// Open the database, create missing tables and resolve key material.
    pub async fn init(cfg: &AppConfig) -> anyhow::Result<Self> {
        ensure_parent_dir(&cfg.server.database_path)?;
        let options = SqliteConnectOptions::from_str(&sqlite_url(&cfg.server.database_path))?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let users = UserStore::new(pool.clone());
        users.migrate().await?;
        let store = SqliteSessionStore::new(pool.clone());
        store.migrate().await?;

        let sessions = SessionManager::from_config(
            &cfg.session,
            &cfg.crypto,
            &cfg.keys,
            Arc::new(MemoryRegistry::new()),
            Arc::new(store),
        )?;

        Ok(Self {
            cfg: cfg.clone(),
            db: pool,
            users,
            sessions,
        })
    }

    /// State over an in-memory database with throwaway keys.
    pub async fn ephemeral(cfg: &AppConfig) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let users = UserStore::new(pool.clone());
        users.migrate().await?;
        let store = SqliteSessionStore::new(pool.clone());
        store.migrate().await?;

        let keypair = KeyPair::generate()?;
        let public_key = keypair.public_key();
        let ctx = SessionContext::new(
            PayloadCodec::from_key_hex(&PayloadCodec::generate_key_hex())?,
            keypair,
            public_key,
            Arc::new(MemoryRegistry::new()),
            Arc::new(store),
            cfg.session.lifetimes()?,
            cfg.session.roles.clone(),
        );

        Ok(Self {
            cfg: cfg.clone(),
            db: pool,
            users,
            sessions: SessionManager::new(ctx, cfg.session.default_role.clone()),
        })
    }
}

fn sqlite_url(path: &str) -> String {
    // sqlx sqlite URL format: sqlite://relative/path.db (or sqlite:/abs/path.db)
    if Path::new(path).is_absolute() {
        format!("sqlite:{}", path)
    } else {
        format!("sqlite://{}", path)
    }
}

fn ensure_parent_dir(file_path: &str) -> anyhow::Result<()> {
    let p = Path::new(file_path);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
