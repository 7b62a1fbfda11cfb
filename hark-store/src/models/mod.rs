//! Record types persisted by the store.

pub mod config_entry;
pub mod kind;
pub mod machine;
pub mod network_interface;
pub mod port_mapping;

pub use config_entry::ConfigEntry;
pub use kind::{DriverKind, Guest};
pub use machine::{Machine, MEMORY_MINIMUM};
pub use network_interface::{NetworkInterface, PRIVATE_KIND};
pub use port_mapping::{PortMapping, SSH_GUEST_PORT, SSH_MAPPING_NAME};
