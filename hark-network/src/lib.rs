//! Scarce-resource allocation for hark machines.
//!
//! Host ports and private addresses are handed out by scanning for a
//! candidate that is not already recorded against another machine. The
//! [`WorkflowLock`] serializes the scan-then-persist sequence across
//! processes.

pub mod address;
pub mod lock;
pub mod port;

pub use address::Network;
pub use lock::WorkflowLock;
pub use port::{free_port, OsPortSource, PortSource};
