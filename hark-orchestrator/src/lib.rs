//! Machine orchestration for hark.
//!
//! [`HarkContext`] opens a home directory, [`LocalClient`] exposes the
//! record and image operations over it, and the procedures in
//! [`procedure`] sequence client, driver and allocator calls into the
//! create-machine and destroy-machine workflows.

pub mod client;
pub mod context;
pub mod procedure;

pub use client::LocalClient;
pub use context::HarkContext;
pub use procedure::{DestroyMachine, Level, Message, NewMachine, Outcome, Procedure};
