//! TigerStyle Constants
//!
//! All limits use big-endian naming: CATEGORY_SPECIFICS_UNIT_LIMIT.
//! Every constant includes units in the name where one applies.

// =============================================================================
// Connection
// =============================================================================

/// Fixed delay between connection attempts.
///
/// The retry loop never grows this and never gives up by default: the
/// backing store is allowed to come up after the application does.
pub const CONNECT_RETRY_DELAY_MS: u64 = 3000;

// =============================================================================
// Entities
// =============================================================================

/// Property name treated as the entity identity by `fetch`.
pub const ID_PROPERTY: &str = "id";

/// Maximum length of an entity type name
pub const ENTITY_TYPE_BYTES_MAX: usize = 128;

// =============================================================================
// Queries
// =============================================================================

/// Maximum result cap a caller may request from `find_all`
pub const FIND_LIMIT_MAX: u64 = 1_000;
