//! Wire types for the CADView API and the browser collaborator.
//!
//! This crate contains the serde-serializable types exchanged with the
//! CADView REST API, the OIDC credential read out of browser local storage,
//! and the network lifecycle events reported by the browser. These types
//! represent the "protocol layer": the shapes of data as they appear on the
//! wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no behavior beyond serialization and small accessors
//! * 1:1 with the upstream JSON: field names follow the API's keys
//! * Lenient: upstream nulls and missing keys decode to `None`/defaults
//!
//! Session orchestration and HTTP plumbing are built on top of these types in
//! `cadview-rs`.

pub mod call;
pub mod credential;
mod de;
pub mod network;
pub mod ori;
pub mod sub_resource;

pub use call::*;
pub use credential::*;
pub use network::*;
pub use ori::*;
pub use sub_resource::*;
