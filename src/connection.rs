//! Connection State Machine
//!
//! `TigerStyle`: One writer, explicit states, no torn reads.
//!
//! # States
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──success──▶ Connected
//!       ▲                        │   ▲                    │
//!       │                        └───┘ (failure,          │
//!       └────────disconnect()──────────retry forever)─────┘
//! ```
//!
//! The mapping table (entity type name → backend model handle) is written
//! exactly once per successful connect and cleared on disconnect. State and
//! table live behind one `RwLock` so a call racing a disconnect observes
//! either a fully connected or a fully disconnected manager, never a torn
//! state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::constants::CONNECT_RETRY_DELAY_MS;
use crate::error::{DbError, DbResult};
use crate::logger::Logger;

// =============================================================================
// Retry Policy
// =============================================================================

/// How the connect loop retries.
///
/// The contract default retries forever at a fixed interval: the backing
/// store may come up after the application (container orchestration racing
/// startup order). A maximum-attempt ceiling is an opt-in generalization;
/// when it is exhausted the caller sees [`DbError::Connection`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Contract default: 3000 ms between attempts, no ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(CONNECT_RETRY_DELAY_MS),
            max_attempts: None,
        }
    }

    /// Override the fixed delay between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cap the number of attempts.
    ///
    /// # Panics
    /// Panics if `max_attempts` is zero.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        // Precondition
        assert!(max_attempts > 0, "max_attempts must be positive");

        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True when another attempt is allowed after `attempts` failures.
    #[must_use]
    pub fn allows_another(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Inner<M> {
    state: ConnectionState,
    mappings: Option<HashMap<String, M>>,
    logger: Option<Arc<dyn Logger>>,
}

/// Owns the connection state, the registered entity-type → model mapping
/// and the logger handed over at connect time.
///
/// Generic over the backend model handle `M`; the retry loop itself lives
/// with each backend service because the attempt is driver-specific.
pub(crate) struct ConnectionManager<M> {
    inner: RwLock<Inner<M>>,
}

impl<M: Clone> ConnectionManager<M> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: ConnectionState::Disconnected,
                mappings: None,
                logger: None,
            }),
        }
    }

    /// Enter `Connecting` and adopt the caller's logger.
    ///
    /// Calling connect again while already `Connecting` is a caller error;
    /// the contract leaves it unvalidated.
    pub(crate) async fn begin(&self, logger: Arc<dyn Logger>) {
        let mut inner = self.inner.write().await;
        inner.state = ConnectionState::Connecting;
        inner.logger = Some(logger);
    }

    /// Enter `Connected` with a freshly built mapping table.
    pub(crate) async fn complete(&self, mappings: HashMap<String, M>) {
        let mut inner = self.inner.write().await;

        inner.state = ConnectionState::Connected;
        inner.mappings = Some(mappings);

        // Postcondition
        assert!(
            inner.mappings.is_some(),
            "connected manager must hold a mapping table"
        );
    }

    /// Enter `Disconnected`, destroying the mapping table.
    ///
    /// The logger survives so a later disconnect can still report.
    pub(crate) async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.state = ConnectionState::Disconnected;
        inner.mappings = None;
    }

    /// Look up the model handle for an entity type.
    ///
    /// The central invariant lives here: no backend operation may execute
    /// before the mapping table exists.
    pub(crate) async fn model(&self, entity_type: &str) -> DbResult<M> {
        let inner = self.inner.read().await;

        let mappings = inner.mappings.as_ref().ok_or(DbError::NotConnected)?;
        mappings
            .get(entity_type)
            .cloned()
            .ok_or_else(|| DbError::model_not_found(entity_type))
    }

    /// Logger supplied at connect time, if any.
    pub(crate) async fn logger(&self) -> Option<Arc<dyn Logger>> {
        self.inner.read().await.logger.clone()
    }

    /// True while a connection (or connect attempt) exists.
    pub(crate) async fn is_active(&self) -> bool {
        self.inner.read().await.state != ConnectionState::Disconnected
    }
}
