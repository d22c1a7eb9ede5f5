//! Service Registry
//!
//! Maps a string key to a factory for a concrete [`DataService`]
//! implementation, so application code can select its backend from
//! configuration without naming a type.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::logger::Logger;
use crate::service::DataService;

const SCOPE: &str = "ServiceRegistry";

type ServiceFactory = Box<dyn Fn() -> Box<dyn DataService> + Send + Sync>;

/// Registry of data service factories keyed by backend name.
pub struct ServiceRegistry {
    logger: Arc<dyn Logger>,
    services: HashMap<String, ServiceFactory>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            services: HashMap::new(),
        }
    }

    /// Register a factory under a key; a later registration replaces an
    /// earlier one.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        factory: impl Fn() -> Box<dyn DataService> + Send + Sync + 'static,
    ) {
        self.services.insert(key.into(), Box::new(factory));
    }

    /// Instantiate the service registered under a key.
    pub fn create(&self, key: &str) -> DbResult<Box<dyn DataService>> {
        match self.services.get(key) {
            Some(factory) => Ok(factory()),
            None => {
                self.logger
                    .error(SCOPE, &format!("unhandled db service type - {key}"));
                Err(DbError::unknown_service(key))
            }
        }
    }
}
