//! CADView session harvester.
//!
//! The CADView web client offers no programmatic login, so a [`Session`]
//! drives a real browser through the OIDC login form, records the traffic the
//! page generates, and lifts the bearer [`Credential`] out of local storage.
//! With that credential the [`ApiClient`] reads dispatch calls, and the
//! [`RecordAssembler`] joins each call with its five sub-resource collections.
//!
//! ```ignore
//! let config = SessionConfig::new("https://cad.example/NewWorld.CadView")?
//!     .with_credentials("user", "secret");
//! let session = Session::new(config)?;
//! for call in session.active_calls().await? {
//!     let record = session.fetch_composite(call.call_id).await?;
//!     println!("{} entries", record.entry_count());
//! }
//! ```

pub mod assemble;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod liveness;
pub mod login;
pub mod session;
pub mod traffic;

pub use assemble::{CompositeRecord, RecordAssembler, SubFetchOutcome};
pub use cadview_protocol::{Call, CallLog, Credential, Incident, Narrative, Ori, SubResource, Unit, UnitLog, fdid_to_ori};
pub use client::{ApiClient, CredentialCell};
pub use config::{BrowserOptions, LoginSelectors, SessionConfig};
pub use error::{Error, Result};
pub use liveness::{LivenessHandle, LivenessMonitor, LivenessStatus, Probe};
pub use login::CredentialExtractor;
pub use session::{BrowserFactory, CdpBrowserFactory, Session, SessionState};
pub use traffic::{TrafficCorrelator, TrafficExchange, is_unwanted_traffic};
