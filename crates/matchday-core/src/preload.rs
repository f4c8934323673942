//! Startup preload of a fixed resource set.
//!
//! All tasks run concurrently and are joined together; one failing resource
//! never cancels or delays the others. Resources that are already fresh are
//! skipped unless the preload is forced.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::CacheContext;
use crate::error::FetchError;
use crate::swr::FetchFn;

pub struct PreloadTask {
    pub key: String,
    pub fetch: FetchFn<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadFailure {
    pub key: String,
    pub error: FetchError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    /// Already fresh, not fetched
    pub skipped: Vec<String>,
    pub failures: Vec<PreloadFailure>,
    /// At least one preloaded resource can be rendered without the network
    pub usable_offline: bool,
}

impl PreloadReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct PreloadOrchestrator {
    ctx: CacheContext,
    tasks: Vec<PreloadTask>,
}

impl PreloadOrchestrator {
    pub fn new(ctx: CacheContext) -> Self {
        Self {
            ctx,
            tasks: Vec::new(),
        }
    }

    pub fn task(mut self, key: impl Into<String>, fetch: FetchFn<Value>) -> Self {
        self.tasks.push(PreloadTask {
            key: key.into(),
            fetch,
        });
        self
    }

    pub fn keys(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.key.as_str()).collect()
    }

    pub async fn run(&self, force: bool) -> PreloadReport {
        let cache = self.ctx.cache();
        let mut report = PreloadReport::default();
        let mut pending = Vec::new();

        for task in &self.tasks {
            let fresh = match cache.inspect(&task.key).await {
                Some(info) => !info.is_stale,
                None => false,
            };
            if fresh && !force {
                debug!(key = %task.key, "Preload skipped, cache is fresh");
                report.skipped.push(task.key.clone());
            } else {
                pending.push(task);
            }
        }

        if !pending.is_empty() && !self.ctx.is_online() {
            warn!(count = pending.len(), "Offline, preload cannot fetch");
            report.failures = pending
                .into_iter()
                .map(|task| PreloadFailure {
                    key: task.key.clone(),
                    error: FetchError::Offline,
                })
                .collect();
        } else {
            let results = join_all(pending.into_iter().map(|task| async move {
                match (task.fetch)().await {
                    Ok(data) => {
                        cache.save(&task.key, &data).await;
                        Ok(task.key.clone())
                    }
                    Err(error) => Err(PreloadFailure {
                        key: task.key.clone(),
                        error,
                    }),
                }
            }))
            .await;

            for result in results {
                match result {
                    Ok(key) => report.loaded.push(key),
                    Err(failure) => {
                        warn!(key = %failure.key, error = %failure.error, "Preload failed");
                        report.failures.push(failure);
                    }
                }
            }
        }

        report.usable_offline = cache.has_any_valid(&self.keys()).await;
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            usable_offline = report.usable_offline,
            "Preload complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::network::NetworkStatus;
    use crate::store::MemoryStore;
    use crate::swr::fetcher;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn context(online: bool) -> (CacheContext, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let ctx = CacheContext::builder(Arc::new(MemoryStore::new()))
            .clock(clock.clone())
            .connectivity(Arc::new(NetworkStatus::new(online)))
            .open()
            .await;
        (ctx, clock)
    }

    fn ok(value: Value) -> FetchFn<Value> {
        fetcher(move || {
            let value = value.clone();
            async move { Ok::<_, FetchError>(value) }
        })
    }

    fn fail(message: &'static str) -> FetchFn<Value> {
        fetcher(move || async move { Err::<Value, _>(FetchError::request(message)) })
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_block_others() {
        let (ctx, _) = context(true).await;
        let report = PreloadOrchestrator::new(ctx.clone())
            .task("teams:all", ok(json!(["Rovers"])))
            .task("standings:competition:1", fail("Server error: 500"))
            .task("seasons:all", ok(json!([2024])))
            .run(false)
            .await;

        assert!(!report.is_success());
        assert_eq!(report.loaded, vec!["teams:all".to_string(), "seasons:all".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "standings:competition:1");
        assert_eq!(report.failures[0].error, FetchError::request("Server error: 500"));
        assert!(report.usable_offline);
        assert!(ctx.cache().has_valid("seasons:all").await);
    }

    fn slow(value: Value, delay: Duration) -> FetchFn<Value> {
        fetcher(move || {
            let value = value.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok::<_, FetchError>(value)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_concurrently() {
        let (ctx, _) = context(true).await;
        let delay = Duration::from_millis(50);
        let preload = PreloadOrchestrator::new(ctx)
            .task("teams:all", slow(json!([]), delay))
            .task("seasons:all", slow(json!([]), delay))
            .task("competitions:season:2024", slow(json!([]), delay));

        let started = tokio::time::Instant::now();
        let report = preload.run(false).await;
        let elapsed = started.elapsed();

        assert_eq!(report.loaded.len(), 3);
        assert!(elapsed >= delay);
        assert!(elapsed < 2 * delay, "tasks ran one after another: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_fresh_entries_are_skipped_unless_forced() {
        let (ctx, clock) = context(true).await;
        ctx.cache().save("teams:all", &json!(["cached"])).await;
        ctx.cache().save("matches:team:1:results", &json!([])).await;
        clock.advance(Duration::from_secs(11 * 60));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let counted = fetcher(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FetchError>(json!(["fetched"])) }
        });

        let preload = PreloadOrchestrator::new(ctx.clone())
            .task("teams:all", counted.clone())
            .task("matches:team:1:results", counted);

        // Teams are fresh for 24h, results went stale after 10 minutes
        let report = preload.run(false).await;
        assert_eq!(report.skipped, vec!["teams:all".to_string()]);
        assert_eq!(report.loaded, vec!["matches:team:1:results".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let forced = preload.run(true).await;
        assert!(forced.skipped.is_empty());
        assert_eq!(forced.loaded.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_offline_preload_reports_every_pending_task() {
        let (ctx, _) = context(false).await;
        let report = PreloadOrchestrator::new(ctx)
            .task("teams:all", ok(json!([])))
            .task("seasons:all", ok(json!([])))
            .run(false)
            .await;

        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.error == FetchError::Offline));
        assert!(!report.usable_offline);
    }
}
