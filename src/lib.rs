//! Hashi - Backend-Agnostic Data Access
//!
//! One CRUD/query contract over two storage backends. Application code
//! obtains a [`DataService`] from the [`registry`](crate::registry) and
//! never learns whether a document store or a relational store is active.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DataService Trait                        │
//! │   connect / disconnect / create / save / fetch / find_all    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ConnectionManager        │ retry-forever state machine      │
//! │  Criteria Translators     │ neutral criteria → native query  │
//! │  Entity                   │ caller-owned property bag        │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲                                ▲
//!          │                                │
//! ┌────────┴────────┐              ┌────────┴────────┐
//! │ DocumentService │              │RelationalService│
//! │  operator maps  │              │  SQL predicates │
//! └─────────────────┘              └─────────────────┘
//! ```
//!
//! # Connect semantics
//!
//! `connect` retries a failed attempt every 3000 ms, forever: callers
//! perceive only latency, never failure, while the backing store is still
//! coming up. CRUD and query calls issued before a successful connect
//! fail fast with a typed `NotConnected` error.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use hashi::document::DocumentService;
//! use hashi::logger::TracingLogger;
//! use hashi::schema::{FieldKind, SchemaDescriptor};
//! use hashi::service::DataService;
//! use hashi::criteria::{Condition, Search};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hashi::error::DbResult<()> {
//! let service = DocumentService::memory();
//! service
//!     .connect(
//!         Arc::new(TracingLogger),
//!         "memory://books",
//!         vec![SchemaDescriptor::new("book")
//!             .field("title", FieldKind::Text)
//!             .field("price", FieldKind::Number)],
//!     )
//!     .await?;
//!
//! let books = service
//!     .find_all(
//!         "book",
//!         Some(&Search::new().field("price", Condition::range(10.0, 100.0))),
//!         None,
//!         None,
//!         None,
//!     )
//!     .await?;
//! # assert!(books.is_empty());
//! service.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod connection;
pub mod constants;
pub mod criteria;
pub mod document;
pub mod entity;
pub mod error;
pub mod logger;
pub mod registry;
pub mod relational;
pub mod schema;
pub mod service;
pub mod value;

// Re-export common types
pub use connection::RetryPolicy;
pub use criteria::{Condition, Search, Sort, SortOrder};
pub use document::{DocumentService, MemoryDocumentDriver};
pub use entity::Entity;
pub use error::{DbError, DbResult};
pub use logger::{BufferLogger, LogLevel, Logger, TracingLogger};
pub use registry::ServiceRegistry;
pub use relational::{MemoryRelationalDriver, RelationalService};
pub use schema::{FieldKind, SchemaDescriptor};
pub use service::DataService;
pub use value::Value;
