//! Transport implementations
//!
//! - [`tcp::TcpTransport`] reaches the rig through a serial-over-radio bridge
//!   exposed on a TCP socket
//! - [`memory::MemoryTransport`] is an in-process loopback for tests and demos

pub mod memory;
pub mod tcp;
