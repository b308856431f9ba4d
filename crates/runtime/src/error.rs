//! Error types for the browser collaborator.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
	/// Failed to establish a WebSocket connection to Chrome DevTools.
	#[error("failed to connect to Chrome DevTools at {url}: {reason}")]
	ConnectionFailed { url: String, reason: String },

	/// The DevTools connection went away while a command was pending.
	#[error("DevTools connection closed")]
	ConnectionClosed,

	/// A CDP command returned an error response.
	#[error("CDP error {code}: {message}")]
	Cdp { code: i64, message: String },

	/// A CDP command timed out waiting for a response.
	#[error("CDP command '{method}' timed out after {duration:?}")]
	Timeout { method: String, duration: Duration },

	/// A protocol-level error (serialization, unexpected message format, etc.).
	#[error("CDP protocol error: {0}")]
	Protocol(String),

	/// The element never matched or never became visible.
	#[error("element {selector} not visible after {timeout:?}")]
	NotVisible { selector: String, timeout: Duration },

	/// The element is absent at the time of interaction.
	#[error("element not found: {selector}")]
	ElementNotFound { selector: String },

	#[error("navigation to {url} failed: {reason}")]
	Navigation { url: String, reason: String },

	/// JavaScript evaluation returned an exception.
	#[error("JavaScript exception: {0}")]
	JsException(String),

	/// Chrome could not be found, started, or probed.
	#[error("browser launch failed: {0}")]
	Launch(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
