//! Redis cache client.
//!
//! The client opens one multiplexed [`ConnectionManager`] on first use and
//! shares it. [`CacheClient::acquire`] hands out cheap clones; dropping a
//! handle leaves the shared connection open until [`CacheClient::close`].

use crate::error::{DbError, DbResult};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct CacheClient {
    client: redis::Client,
    conn: Mutex<Option<ConnectionManager>>,
}

impl CacheClient {
    /// Validate the URL. No connection is made until first use.
    pub fn new(url: &str) -> DbResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            DbError::cache(format!("Invalid Redis URL: {}", e))
        })?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    /// Open the shared connection. No-op when already connected.
    pub async fn connect(&self) -> DbResult<()> {
        self.connection().await.map(|_| ())
    }

    /// Drop the shared connection. No-op when not connected.
    pub async fn close(&self) {
        if self.conn.lock().await.take().is_some() {
            info!("Redis connection closed");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Connect if needed and return a handle on the shared connection.
    pub async fn acquire(&self) -> DbResult<CacheHandle> {
        Ok(CacheHandle {
            conn: self.connection().await?,
        })
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.acquire().await?.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, expire: Option<Duration>) -> DbResult<()> {
        self.acquire().await?.set(key, value, expire).await
    }

    async fn connection(&self) -> DbResult<ConnectionManager> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_connection_manager().await?;
        info!("Redis connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient").finish_non_exhaustive()
    }
}

/// A clone of the shared cache connection.
#[derive(Clone)]
pub struct CacheHandle {
    conn: ConnectionManager,
}

impl CacheHandle {
    pub async fn get(&mut self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = self.conn.get(key).await?;
        debug!(key = %key, hit = value.is_some(), "Cache get");
        Ok(value)
    }

    /// `SET`, or `SETEX` when an expiry is given. Sub-second expiries round up to one second.
    pub async fn set(&mut self, key: &str, value: &str, expire: Option<Duration>) -> DbResult<()> {
        match expire {
            Some(ttl) => {
                let secs = ttl.as_secs().max(1);
                let _: () = self.conn.set_ex(key, value, secs).await?;
            }
            None => {
                let _: () = self.conn.set(key, value).await?;
            }
        }
        debug!(key = %key, "Cache set");
        Ok(())
    }

    pub async fn ping(&mut self) -> DbResult<()> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(())
    }
}
