//! Persistence layer for hark.
//!
//! Typed records ([`Machine`], [`PortMapping`], [`NetworkInterface`],
//! [`ConfigEntry`]) are mapped onto one sqlite table each. Reads and deletes
//! are qualified with [`Constraints`]; uniqueness of each record's key is
//! enforced by the database and surfaced as `HarkError::DuplicateModel`.

pub mod db;
pub mod models;
pub mod query;
pub mod record;
pub mod store;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use models::{
    ConfigEntry, DriverKind, Guest, Machine, NetworkInterface, PortMapping, MEMORY_MINIMUM,
    PRIVATE_KIND, SSH_GUEST_PORT, SSH_MAPPING_NAME,
};
pub use record::Record;
pub use store::Store;
pub use value::{Constraints, Value};
