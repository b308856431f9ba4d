//! Local port helpers for browser launch.

use std::net::TcpListener;

/// Returns a port that was free on localhost at the time of the call.
pub fn free_port() -> std::io::Result<u16> {
	let listener = TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}
