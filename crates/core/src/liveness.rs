//! Periodic credential liveness checks.
//!
//! The loop sleeps, runs one cheap authenticated call, publishes the outcome
//! on a `watch` channel, and repeats. Failures never stop it and never trigger
//! a new login; only cancellation does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;

/// One lightweight authenticated call.
#[async_trait]
pub trait Probe: Send + Sync {
	async fn check(&self) -> Result<()>;
}

/// Latest observation of the liveness loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LivenessStatus {
	/// No check has completed yet.
	Pending,
	#[serde(rename_all = "camelCase")]
	Alive { at: DateTime<Utc>, checks: u64 },
	#[serde(rename_all = "camelCase")]
	Failing {
		at: DateTime<Utc>,
		consecutive_failures: u32,
		message: String,
	},
	Stopped,
}

impl LivenessStatus {
	pub fn is_alive(&self) -> bool {
		matches!(self, Self::Alive { .. })
	}
}

/// Configured, not yet running, liveness loop.
pub struct LivenessMonitor {
	probe: Arc<dyn Probe>,
	interval: Duration,
}

impl LivenessMonitor {
	pub fn new(probe: Arc<dyn Probe>, interval: Duration) -> Self {
		Self { probe, interval }
	}

	/// Starts the loop on the current runtime. It stops when `cancel` fires.
	pub fn spawn(self, cancel: CancellationToken) -> LivenessHandle {
		let (tx, rx) = watch::channel(LivenessStatus::Pending);
		let token = cancel.clone();
		let task = tokio::spawn(async move {
			info!(target = "cadview.liveness", interval = ?self.interval, "liveness loop started");
			let mut checks = 0u64;
			let mut failures = 0u32;
			loop {
				tokio::select! {
					_ = token.cancelled() => break,
					_ = tokio::time::sleep(self.interval) => {}
				}
				// A check in flight runs to completion; cancellation is seen at the next sleep.
				let status = match self.probe.check().await {
					Ok(()) => {
						checks += 1;
						if failures > 0 {
							info!(target = "cadview.liveness", after_failures = failures, "liveness restored");
						} else {
							debug!(target = "cadview.liveness", checks, "liveness check ok");
						}
						failures = 0;
						LivenessStatus::Alive { at: Utc::now(), checks }
					}
					Err(err) => {
						failures = failures.saturating_add(1);
						warn!(target = "cadview.liveness", consecutive_failures = failures, error = %err, "liveness check failed");
						LivenessStatus::Failing {
							at: Utc::now(),
							consecutive_failures: failures,
							message: err.to_string(),
						}
					}
				};
				tx.send_replace(status);
			}
			tx.send_replace(LivenessStatus::Stopped);
			info!(target = "cadview.liveness", checks, "liveness loop stopped");
		});
		LivenessHandle { cancel, status: rx, task }
	}
}

/// Control handle of a running liveness loop.
pub struct LivenessHandle {
	cancel: CancellationToken,
	status: watch::Receiver<LivenessStatus>,
	task: JoinHandle<()>,
}

impl LivenessHandle {
	pub fn status(&self) -> LivenessStatus {
		self.status.borrow().clone()
	}

	/// A receiver that observes every status change.
	pub fn subscribe(&self) -> watch::Receiver<LivenessStatus> {
		self.status.clone()
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Cancels the loop and waits for it to exit.
	pub async fn stop(self) {
		self.cancel.cancel();
		if let Err(err) = self.task.await {
			warn!(target = "cadview.liveness", error = %err, "liveness task ended abnormally");
		}
	}
}
