//! Asset reachability validation.
//!
//! Probes every resolved URL with a HEAD request (cache bypassed) and
//! records the outcome on the session's shared status table. Validation is
//! advisory: a failed asset stays in the resolved set so the preview still
//! attempts to render it - only the status surface reflects the failure.
//!
//! Probes run concurrently on a shared background runtime, bounded by the
//! configured pool size. Completions are keyed by session token; when a new
//! forward pass supersedes the session, stale completions are dropped
//! without touching any table.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

use crate::config::ValidateSection;
use crate::core::{AssetStatus, ResolvedAsset};
use crate::debug;
use crate::resolve::encode_probe_url;

/// Shared runtime for probe tasks. Never dropped, so the validator can be
/// constructed and used from synchronous callers.
static PROBE_RT: LazyLock<Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("retouch-probe")
        .enable_all()
        .build()
        .expect("probe runtime")
});

/// Shared status table: raw path -> resolved asset.
pub type StatusTable = Arc<DashMap<String, ResolvedAsset>>;

/// Validates resolved assets in the background.
pub struct AssetValidator {
    client: reqwest::Client,
    enable: bool,
    concurrency: usize,
    /// Token of the session whose results are still wanted.
    active: Arc<AtomicU64>,
}

impl AssetValidator {
    pub fn new(config: &ValidateSection) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            enable: config.enable,
            concurrency: config.concurrency.max(1),
            active: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start validating a session's assets. Returns immediately; the handle
    /// exposes monotonic progress and can be sampled at any time.
    ///
    /// Any in-flight probes for a previous token become stale and settle
    /// without writing results.
    pub fn begin(&self, token: u64, statuses: StatusTable) -> ValidationHandle {
        self.active.store(token, Ordering::Release);

        let total = if self.enable { statuses.len() } else { 0 };
        let handle = ValidationHandle {
            token,
            statuses: Arc::clone(&statuses),
            completed: Arc::new(AtomicUsize::new(0)),
            total,
        };

        if total == 0 {
            return handle;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let targets: Vec<(String, String)> = statuses
            .iter()
            .map(|entry| (entry.key().clone(), entry.resolved_url.clone()))
            .collect();

        for (raw, url) in targets {
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let statuses = Arc::clone(&statuses);
            let active = Arc::clone(&self.active);
            let completed = Arc::clone(&handle.completed);

            PROBE_RT.spawn(async move {
                let _permit = semaphore.acquire().await;

                // Superseded before the request went out: settle silently
                if active.load(Ordering::Acquire) != token {
                    completed.fetch_add(1, Ordering::Release);
                    return;
                }

                if let Some(mut entry) = statuses.get_mut(&raw) {
                    entry.status = AssetStatus::Loading;
                }

                let outcome = probe(&client, &url).await;

                // Stale results are dropped, not recorded
                if active.load(Ordering::Acquire) == token {
                    if let Some(mut entry) = statuses.get_mut(&raw) {
                        match outcome {
                            Ok(()) => {
                                entry.status = AssetStatus::Loaded;
                                entry.error = None;
                            }
                            Err(reason) => {
                                debug!("validate"; "unreachable `{}`: {}", url, reason);
                                entry.status = AssetStatus::Error;
                                entry.error = Some(reason);
                            }
                        }
                    }
                }
                completed.fetch_add(1, Ordering::Release);
            });
        }

        handle
    }
}

/// HEAD-probe one URL. 2xx-3xx is reachable; anything else is the reason.
async fn probe(client: &reqwest::Client, url: &str) -> Result<(), String> {
    match client
        .head(encode_probe_url(url))
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await
    {
        Ok(response) => classify_status(response.status().as_u16()),
        Err(err) => Err(err.to_string()),
    }
}

/// Map an HTTP status code to a probe outcome.
fn classify_status(code: u16) -> Result<(), String> {
    if (200..400).contains(&code) {
        Ok(())
    } else {
        Err(format!("HTTP {code}"))
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Live view over one session's validation run.
#[derive(Debug, Clone)]
pub struct ValidationHandle {
    token: u64,
    statuses: StatusTable,
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl ValidationHandle {
    /// Session token this run belongs to.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// (settled, total). Monotonic: the counter only ever increments.
    pub fn progress(&self) -> (usize, usize) {
        let completed = self.completed.load(Ordering::Acquire).min(self.total);
        (completed, self.total)
    }

    /// Settled fraction in `0.0..=1.0`; an empty run counts as done.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        let (completed, total) = self.progress();
        completed as f64 / total as f64
    }

    /// All probes have settled.
    pub fn is_complete(&self) -> bool {
        let (completed, total) = self.progress();
        completed >= total
    }

    /// Point-in-time copy of the status table for display.
    pub fn snapshot(&self) -> Vec<ResolvedAsset> {
        self.statuses
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Raw paths currently marked unreachable.
    pub fn failures(&self) -> Vec<String> {
        self.statuses
            .iter()
            .filter(|entry| entry.status == AssetStatus::Error)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Status surface as JSON, keyed by raw path, for the embedding UI.
    pub fn status_json(&self) -> serde_json::Value {
        let (completed, total) = self.progress();
        let assets: serde_json::Map<String, serde_json::Value> = self
            .statuses
            .iter()
            .map(|entry| {
                let value = serde_json::to_value(entry.value())
                    .unwrap_or(serde_json::Value::Null);
                (entry.key().clone(), value)
            })
            .collect();

        serde_json::json!({
            "completed": completed,
            "total": total,
            "assets": assets,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
