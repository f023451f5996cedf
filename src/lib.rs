//! Stream link manager for the blood-cooling rig sensor feed.
//!
//! The rig's controller writes a continuous, delimiter-free byte stream over
//! a serial-over-radio channel. Every 26 bytes is one sensor snapshot of six
//! comma-separated text fields. This crate owns that link: it connects to one
//! named peer, slices the stream into frames, decodes them, and hands
//! connection and data events to a single subscriber in order.
//!
//! # Features
//!
//! - **One connection slot**: a new connect supersedes the old attempt or
//!   session and waits for it to release its stream
//! - **Cancellable I/O**: a manual disconnect interrupts a blocked read or
//!   handshake promptly
//! - **Strict framing**: partial frames and wrong field counts end the
//!   session instead of producing half-filled records
//! - **Ordered events**: `Connected`, each record in arrival order, then
//!   `Disconnected`
//!
//! ## Example (in-memory rig)
//!
//! ```rust
//! use coolmon::{LinkConfig, LinkEvent, LinkManager, MemoryTransport};
//! use std::sync::Arc;
//! use tokio::io::AsyncWriteExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> coolmon::Result<()> {
//! let mut transport = MemoryTransport::new();
//! let mut rig = transport.add_peer("HC-06");
//! let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());
//!
//! manager.connect().await?;
//! let mut stream = rig.accept().await.expect("link opened");
//! stream.write_all(b"ON,OFF,36.5,37.0,36.8,98.2").await?;
//!
//! assert_eq!(events.recv().await, Some(LinkEvent::Connected));
//! let event = events.recv().await.expect("record");
//! assert_eq!(event.record().map(|r| r.ir_temp.as_str()), Some("98.2"));
//! # Ok(())
//! # }
//! ```

// Core types and error handling
pub mod codec;
pub mod config;
mod error;
pub mod types;

// Link architecture
pub mod connector;
pub mod dispatch;
pub mod manager;
pub mod reader;
pub mod sink;
pub mod transport;
pub mod transports;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use codec::{SensorFrameCodec, decode_record};
pub use config::LinkConfig;
pub use dispatch::LinkEvents;
pub use manager::LinkManager;
pub use sink::EventSink;
pub use transport::{Connection, Transport};
pub use transports::memory::MemoryTransport;
pub use transports::tcp::TcpTransport;
