//! Browser collaborator for the CADView harvester.
//!
//! This crate owns everything that touches a real browser:
//!
//! - [`Browser`]: the remote-control contract the login flow is written
//!   against (navigate, wait, type, submit, local storage, network events,
//!   response bodies)
//! - [`cdp`]: a Chrome DevTools Protocol connection and the [`CdpBrowser`]
//!   implementation of [`Browser`]
//! - [`launch`]: Chrome discovery, process launch, and DevTools endpoint
//!   probing
//!
//! The core crate only depends on the [`Browser`] trait, so tests can swap in
//! a scripted fake without launching Chrome.

pub mod browser;
pub mod cdp;
pub mod error;
pub mod launch;
pub mod process;

pub use browser::{Browser, StorageEntry};
pub use cdp::{CdpBrowser, CdpConnection, CdpEvent};
pub use error::{BrowserError, Result};
pub use launch::{ChromeProcess, LaunchOptions};
