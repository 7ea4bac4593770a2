//! Session management.
//!
//! Sessions live in Redis when it is configured and in process memory
//! otherwise. The page renderer only needs to know who is logged in.

use anyhow::{Context, Result};
use fred::prelude::*;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer, SessionStore};
use tower_sessions_redis_store::RedisStore;
use tracing::debug;

/// Default session expiry (24 hours).
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// Session key holding the logged-in user's name.
pub const SESSION_USERNAME: &str = "username";

/// Parse a SameSite policy name, defaulting to strict.
pub fn same_site_from_str(value: &str) -> SameSite {
    match value {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    }
}

/// Create the session layer using Redis as the backend.
pub async fn redis_session_layer(
    redis_url: &str,
    same_site: SameSite,
) -> Result<SessionManagerLayer<RedisStore<Pool>>> {
    let config = Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    Ok(configure(RedisStore::new(pool), same_site))
}

/// Create a session layer that keeps sessions in process memory.
pub fn memory_session_layer(same_site: SameSite) -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default(), same_site)
}

fn configure<S: SessionStore>(store: S, same_site: SameSite) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(true)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            DEFAULT_SESSION_EXPIRY_HOURS,
        )))
}

/// Name of the logged-in user, if any.
///
/// Session backend errors count as anonymous.
pub async fn current_username(session: &Session) -> Option<String> {
    match session.get::<String>(SESSION_USERNAME).await {
        Ok(username) => username.filter(|name| !name.is_empty()),
        Err(e) => {
            debug!(error = %e, "failed to read session, treating request as anonymous");
            None
        }
    }
}
