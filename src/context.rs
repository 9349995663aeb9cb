use crate::config::AppConfig;
use crate::dao::SqliteLinkStore;
use crate::error::AppError;
use crate::hasher::VisitorHasher;
use crate::ledger::VisitorLedger;
use crate::mail::{Mailer, SmtpMailer};
use crate::store::{LinkStore, MemoryLinkStore};
use crate::tasks::TaskQueue;
use crate::utils::hex_encode;
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::SqlitePool;
use std::sync::Arc;

const ADMIN_TOKEN_BYTES: usize = 32;

/// Everything a handler needs, built once at startup and shared through
/// axum state. There is no process-wide mutable state outside this struct.
pub struct AppContext {
    pub config: AppConfig,
    pub links: Arc<dyn LinkStore>,
    pub ledger: VisitorLedger,
    pub hasher: VisitorHasher,
    pub mailer: Arc<dyn Mailer>,
    pub tasks: TaskQueue,
    /// Admin session token, minted per process. Restarting logs everyone
    /// out.
    pub admin_token: String,
}

impl AppContext {
    pub fn new(config: AppConfig, pool: SqlitePool) -> Result<Arc<Self>, AppError> {
        let mailer = Arc::new(SmtpMailer::new(config.mail.clone()));
        let links: Arc<dyn LinkStore> = if config.ephemeral_links {
            Arc::new(MemoryLinkStore::new())
        } else {
            Arc::new(SqliteLinkStore::new(pool.clone()))
        };
        Ok(Arc::new(Self {
            links,
            ledger: VisitorLedger::new(pool),
            hasher: VisitorHasher::new()?,
            mailer,
            tasks: TaskQueue::start(),
            admin_token: generate_admin_token()?,
            config,
        }))
    }
}

fn generate_admin_token() -> Result<String, AppError> {
    let mut bytes = [0u8; ADMIN_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex_encode(&bytes))
}
