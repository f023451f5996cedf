//! Core types for the sensor link.
//!
//! - [`SensorRecord`] is one decoded 26-byte frame, six raw text fields
//! - [`Peer`] names a bonded endpoint, its address and its opaque [`ServiceToken`]
//! - [`LinkState`] is the connection lifecycle observed by the subscriber
//! - [`LinkEvent`] is what travels on the ordered subscriber channel
//!
//! ## Usage Example
//!
//! ```rust
//! use coolmon::types::{Peer, ServiceToken, find_peer};
//!
//! let bonded = vec![
//!     Peer::new("HC-05", "98:D3:31:F5:12:01"),
//!     Peer::new("HC-06", "98:D3:31:F5:12:02"),
//! ];
//! let peer = find_peer(&bonded, "HC-06").expect("bonded");
//! assert_eq!(peer.name(), "HC-06");
//! assert!(find_peer(&bonded, "hc-06").is_none());
//! assert_eq!(peer.token(), &ServiceToken::default());
//! ```

mod event;
mod link_state;
mod peer;
mod record;

pub use event::LinkEvent;
pub use link_state::LinkState;
pub use peer::{Peer, ServiceToken, find_peer};
pub use record::{FIELD_COUNT, FIELD_SEPARATOR, RECORD_SIZE, SensorRecord};
