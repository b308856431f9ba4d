//! Chrome DevTools Protocol plumbing.
//!
//! [`CdpConnection`] correlates commands with responses over one page-level
//! WebSocket and fans events out to subscribers; [`CdpBrowser`] builds the
//! [`Browser`](crate::Browser) operations on top of it.

mod connection;
mod events;
mod page;

pub use connection::{CdpConnection, CdpEvent, DEFAULT_COMMAND_TIMEOUT};
pub use events::network_event;
pub use page::CdpBrowser;
