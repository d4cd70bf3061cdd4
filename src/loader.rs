//! Common resource loading with live progress.
//!
//! The request runs on one spawned task and hands its classified result back
//! through a oneshot channel. The caller's task ticks the progress indicator
//! until that result arrives, completes the indicator, and joins the worker.
//! The worker is never cancelled, however long it runs.

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::control_plane::ControlPlane;
use crate::error::ResourceLoadFailure;
use crate::progress::ProgressSink;

/// Default estimate of how long the control plane takes to load everything.
pub const DEFAULT_EXPECTED_SECS: u64 = 240;

const SPEC_TAG: &str = "spec:";
const IMAGE_TAG: &str = "image:";
const FAILED_TAG: &str = "[Failed]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub successful_specs: usize,
    pub failed_specs: usize,
    pub successful_images: usize,
    pub failed_images: usize,
}

impl ResourceCounts {
    /// Tally output lines by substring: `spec:` or `image:`, failed if `[Failed]` appears.
    ///
    /// This mirrors the control plane's free-text output format; lines matching
    /// neither tag are ignored.
    pub fn classify<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for line in lines {
            let failed = line.contains(FAILED_TAG);
            if line.contains(SPEC_TAG) {
                if failed {
                    counts.failed_specs += 1;
                } else {
                    counts.successful_specs += 1;
                }
            } else if line.contains(IMAGE_TAG) {
                if failed {
                    counts.failed_images += 1;
                } else {
                    counts.successful_images += 1;
                }
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLoadOutcome {
    Success(ResourceCounts),
    Failure(ResourceLoadFailure),
}

impl ResourceLoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResourceLoadOutcome::Success(_))
    }

    /// Classify a `loadCommonResource` response body.
    pub fn from_response(body: &Value) -> Self {
        let output = match body {
            Value::Null => return Self::Failure(ResourceLoadFailure::NoContent),
            Value::Object(map) => match map.get("output") {
                None => return Self::Failure(ResourceLoadFailure::NoOutput),
                Some(Value::Null) => return Self::Failure(ResourceLoadFailure::EmptyOutput),
                Some(output) => output,
            },
            _ => return Self::Failure(ResourceLoadFailure::NoOutput),
        };

        let lines: Vec<String> = match output {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Value::String(s) => vec![s.clone()],
            _ => Vec::new(),
        };

        Self::Success(ResourceCounts::classify(lines.iter().map(String::as_str)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLoadReport {
    pub outcome: ResourceLoadOutcome,
    pub elapsed: Duration,
}

impl ResourceLoadReport {
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }
}

/// Request the resource load and classify whatever comes back.
pub async fn load_resources(client: &dyn ControlPlane) -> ResourceLoadOutcome {
    match client.load_common_resource().await {
        Ok(body) => ResourceLoadOutcome::from_response(&body),
        Err(e) => ResourceLoadOutcome::Failure(ResourceLoadFailure::Request(e.to_string())),
    }
}

/// Run the resource load on a background task while `progress` advances once per `tick`.
///
/// The indicator stops at `expected_secs` but the load is awaited to completion;
/// when it finishes the indicator is forced to its maximum.
pub async fn load_resources_with_progress<P: ProgressSink>(
    client: Arc<dyn ControlPlane>,
    tick: Duration,
    progress: &mut P,
) -> ResourceLoadReport {
    let started = Instant::now();
    info!("loading common specs and images");

    let (done_tx, mut done_rx) = oneshot::channel();
    let worker = tokio::spawn(async move {
        let outcome = load_resources(client.as_ref()).await;
        // Receiver outlives the worker; a send error only means the caller is gone.
        let _ = done_tx.send(outcome);
    });

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
    let received = loop {
        tokio::select! {
            biased;
            result = &mut done_rx => break result,
            _ = ticker.tick() => progress.advance(1),
        }
    };
    progress.finish();

    if let Err(e) = worker.await {
        warn!(error = %e, "resource load task did not finish cleanly");
    }

    let outcome = received
        .unwrap_or(ResourceLoadOutcome::Failure(ResourceLoadFailure::Interrupted));
    let elapsed = started.elapsed();
    info!(
        success = outcome.is_success(),
        elapsed_secs = elapsed.as_secs(),
        "common resource load finished"
    );

    ResourceLoadReport { outcome, elapsed }
}
