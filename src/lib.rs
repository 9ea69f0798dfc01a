//! Single CPU virtual machine whose memory lives behind a message channel.
//!
//! The [`processor`] never touches storage directly: every read and write is a
//! request to the [`memory`] engine running on its own thread, carried by the
//! [`bus`] protocol. [`machine`] ties the two together.

pub mod bus;
pub mod fault;
pub mod machine;
pub mod memory;
pub mod processor;

pub use fault::Fault;
pub use machine::Machine;
