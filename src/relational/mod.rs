//! Relational Backend
//!
//! The facade over a relational store. Criteria translate into an ordered
//! predicate list combined with logical AND and rendered as parameterized
//! SQL; an empty list means no `WHERE` clause at all. Only the first sort
//! entry is honored (documented asymmetry with the document backend).
//!
//! `create` persists immediately (documented capability difference from
//! the document backend).

mod driver;
mod memory;
mod query;
mod service;

#[cfg(feature = "postgres")]
mod postgres;

pub use driver::{RelationalDriver, TableModel};
pub use memory::MemoryRelationalDriver;
pub use query::{translate_search, translate_sort, Predicate, SelectQuery};
pub use service::RelationalService;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;
