//! Bounded fan-out over [`PageFetcher`] with one deadline for the whole batch.
//!
//! The result map is owned by the call and is total over its input: every URL
//! is seeded with an empty string and only overwritten by a task that finished
//! before the deadline. Tasks still running at the deadline are aborted and
//! their output, should it ever arrive, has nowhere to go.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::fetch::PageFetcher;

pub const SCRAPE_WORKERS: usize = 3;
pub const SCRAPE_DEADLINE: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub pages: HashMap<String, String>,
    /// Fetches still in flight when the deadline hit.
    pub abandoned: usize,
}

impl ScrapeOutcome {
    pub fn text_for(&self, url: &str) -> &str {
        self.pages.get(url).map(String::as_str).unwrap_or("")
    }
}

#[derive(Clone)]
pub struct ScrapeCoordinator {
    fetcher: Arc<dyn PageFetcher>,
    max_workers: usize,
    deadline: Duration,
}

impl ScrapeCoordinator {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_limits(fetcher, SCRAPE_WORKERS, SCRAPE_DEADLINE)
    }

    pub fn with_limits(fetcher: Arc<dyn PageFetcher>, max_workers: usize, deadline: Duration) -> Self {
        Self {
            fetcher,
            max_workers: max_workers.max(1),
            deadline,
        }
    }

    pub async fn scrape_all(&self, urls: &[String], max_chars: usize) -> ScrapeOutcome {
        let mut pages: HashMap<String, String> =
            urls.iter().map(|url| (url.clone(), String::new())).collect();
        if pages.is_empty() {
            return ScrapeOutcome::default();
        }

        let deadline = Instant::now() + self.deadline;
        let workers = self.max_workers.min(pages.len());
        let permits = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for url in pages.keys().cloned() {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                let text = fetcher.fetch(&url, max_chars).await;
                Some((url, text))
            });
        }

        let mut abandoned = 0;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(Some((url, text))))) => {
                    pages.insert(url, text);
                }
                Ok(Some(Ok(None))) => {}
                Ok(Some(Err(err))) => {
                    tracing::debug!("scrape task ended abnormally: {}", err);
                }
                Ok(None) => break,
                Err(_) => {
                    abandoned = tasks.len();
                    tracing::warn!(
                        "{} of {} page scrapes did not finish within {:?}",
                        abandoned,
                        pages.len(),
                        self.deadline
                    );
                    break;
                }
            }
        }

        // Non-blocking: stragglers are cancelled at their next await point.
        tasks.abort_all();
        drop(tasks);

        ScrapeOutcome { pages, abandoned }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Echoes the URL, hangs forever on URLs containing "hang", panics on
    /// URLs containing "panic".
    struct ScriptedFetcher;

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, max_chars: usize) -> String {
            if url.contains("hang") {
                std::future::pending::<()>().await;
            }
            if url.contains("panic") {
                panic!("parser blew up");
            }
            format!("texto de {}", url).chars().take(max_chars).collect()
        }
    }

    struct ConcurrencyGauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for ConcurrencyGauge {
        async fn fetch(&self, _url: &str, _max_chars: usize) -> String {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(40)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            "ok".to_string()
        }
    }

    struct LateFetcher {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PageFetcher for LateFetcher {
        async fn fetch(&self, _url: &str, _max_chars: usize) -> String {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.store(true, Ordering::SeqCst);
            "late".to_string()
        }
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn completed_fetches_fill_the_map() {
        let coordinator = ScrapeCoordinator::new(Arc::new(ScriptedFetcher));
        let input = urls(&["https://a.co", "https://b.co"]);

        let outcome = coordinator.scrape_all(&input, 800).await;

        assert_eq!(outcome.abandoned, 0);
        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.text_for("https://a.co"), "texto de https://a.co");
        assert_eq!(outcome.text_for("https://b.co"), "texto de https://b.co");
    }

    #[tokio::test]
    async fn hanging_fetches_do_not_hold_the_caller_past_the_deadline() {
        let deadline = Duration::from_millis(200);
        let coordinator = ScrapeCoordinator::with_limits(Arc::new(ScriptedFetcher), 3, deadline);
        let input = urls(&["https://hang-1.co", "https://ok.co", "https://hang-2.co"]);

        let started = std::time::Instant::now();
        let outcome = coordinator.scrape_all(&input, 800).await;
        let elapsed = started.elapsed();

        assert!(elapsed < deadline + Duration::from_millis(300), "took {:?}", elapsed);
        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.abandoned, 2);
        assert_eq!(outcome.text_for("https://hang-1.co"), "");
        assert_eq!(outcome.text_for("https://hang-2.co"), "");
        assert_eq!(outcome.text_for("https://ok.co"), "texto de https://ok.co");
    }

    #[tokio::test]
    async fn map_stays_total_when_nothing_finishes() {
        let coordinator = ScrapeCoordinator::with_limits(
            Arc::new(ScriptedFetcher),
            3,
            Duration::from_millis(50),
        );
        let input = urls(&["https://hang-a.co", "https://hang-b.co", "https://hang-c.co", "https://hang-d.co"]);

        let outcome = coordinator.scrape_all(&input, 800).await;

        assert_eq!(outcome.pages.len(), 4);
        assert!(outcome.pages.values().all(String::is_empty));
        assert_eq!(outcome.abandoned, 4);
    }

    #[tokio::test]
    async fn worker_pool_is_bounded_by_three_and_by_input_size() {
        let gauge = Arc::new(ConcurrencyGauge {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let coordinator = ScrapeCoordinator::new(gauge.clone());
        let input: Vec<String> = (0..7).map(|i| format!("https://site-{i}.co")).collect();

        let outcome = coordinator.scrape_all(&input, 800).await;
        assert_eq!(outcome.abandoned, 0);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);

        let small = Arc::new(ConcurrencyGauge {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        ScrapeCoordinator::new(small.clone())
            .scrape_all(&urls(&["https://x.co", "https://y.co"]), 800)
            .await;
        assert!(small.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn abandoned_fetches_are_cancelled_and_never_observed() {
        let finished = Arc::new(AtomicBool::new(false));
        let coordinator = ScrapeCoordinator::with_limits(
            Arc::new(LateFetcher {
                finished: finished.clone(),
            }),
            3,
            Duration::from_millis(50),
        );

        let outcome = coordinator.scrape_all(&urls(&["https://slow.co"]), 800).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(outcome.text_for("https://slow.co"), "");
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_fetch_leaves_its_slot_empty() {
        let coordinator = ScrapeCoordinator::new(Arc::new(ScriptedFetcher));
        let outcome = coordinator
            .scrape_all(&urls(&["https://panic.co", "https://fine.co"]), 800)
            .await;

        assert_eq!(outcome.abandoned, 0);
        assert_eq!(outcome.text_for("https://panic.co"), "");
        assert_eq!(outcome.text_for("https://fine.co"), "texto de https://fine.co");
    }

    #[tokio::test]
    async fn empty_input_returns_empty_map() {
        let coordinator = ScrapeCoordinator::new(Arc::new(ScriptedFetcher));
        let outcome = coordinator.scrape_all(&[], 800).await;
        assert!(outcome.pages.is_empty());
        assert_eq!(outcome.abandoned, 0);
    }
}
