//! Document Backend
//!
//! The facade over a document-oriented store. Criteria translate into a
//! flat operator map (`field → value | {"$regex"} | {"$gt"/"$lt"}`) the
//! way a document database consumes them; the full sort specification is
//! honored.
//!
//! `create` returns an in-memory instance pending an explicit `save`
//! (documented capability difference from the relational backend).

mod driver;
mod memory;
mod query;
mod service;

pub use driver::DocumentDriver;
pub use memory::MemoryDocumentDriver;
pub use query::{translate_search, translate_sort, DocumentQuery, FindOptions};
pub use service::{DocumentModel, DocumentService};
