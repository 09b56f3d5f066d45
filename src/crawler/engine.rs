//! Crawl loop orchestration
//!
//! The engine owns the process-scoped crawl state (dedup filter, frontier,
//! visit counter, stop flag) as explicit instance fields, so several engines
//! can coexist in one test process. Per iteration it dequeues a URL, consults
//! the dedup filter, resolves the governing rule, fetches, paces, runs the
//! extraction pipeline, hands a non-empty record to the rule's sink, marks
//! the URL seen and increments the visit counter.
//!
//! Failure policy: errors are caught at the single-URL boundary. A fetch or
//! extraction problem is logged, the URL is marked seen, and the loop keeps
//! going; only a visit-counter persist failure stops the worker, because a
//! silently non-advancing counter would be unrecoverable.

use crate::config::Config;
use crate::counter::VisitCounter;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::pipeline;
use crate::dedup::DedupFilter;
use crate::frontier::Frontier;
use crate::rules::RuleSet;
use crate::{Result, SpiderError, UrlError};
use scraper::Html;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Crawl loop state, observable through [`CrawlHandle::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Fetching = 1,
    Extracting = 2,
    Finalizing = 3,
    Stopped = 4,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Idle,
            1 => EngineState::Fetching,
            2 => EngineState::Extracting,
            3 => EngineState::Finalizing,
            _ => EngineState::Stopped,
        }
    }
}

/// Cloneable handle for controlling a running engine.
#[derive(Clone)]
pub struct CrawlHandle {
    stop: Arc<AtomicBool>,
    frontier: Arc<Frontier>,
    state: Arc<AtomicU8>,
}

impl CrawlHandle {
    /// Injects a URL into the frontier (operator submission or seed load).
    pub fn submit_url(&self, url: impl Into<String>) {
        self.frontier.push(url.into());
    }

    /// Requests a cooperative stop: the flag is polled once per iteration and
    /// the frontier is closed so a blocked dequeue wakes up. An in-flight
    /// fetch is not aborted, so shutdown latency is bounded by the fetch
    /// timeout.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.frontier.close();
    }

    /// Current loop state.
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of URLs currently queued in the frontier.
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }
}

/// The crawl engine: rule matching, fetching, extraction and bookkeeping
/// around a single worker loop. The shared structures (frontier, dedup
/// filter) are concurrency-safe, so additional workers can be layered on
/// without structural changes.
pub struct CrawlEngine<F> {
    rules: Arc<RuleSet>,
    dedup: Arc<DedupFilter>,
    frontier: Arc<Frontier>,
    counter: VisitCounter,
    fetcher: F,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    fetch_timeout: Duration,
    page_delay: Duration,
}

impl<F: PageFetcher> CrawlEngine<F> {
    /// Builds an engine from a validated configuration, compiling the rule
    /// set and its sinks.
    pub fn new(config: &Config, fetcher: F) -> Result<Self> {
        let rules = RuleSet::from_config(config)?;
        Self::with_rules(config, rules, fetcher)
    }

    /// Builds an engine around a pre-compiled rule set (used by tests to
    /// attach in-memory sinks).
    pub fn with_rules(config: &Config, rules: RuleSet, fetcher: F) -> Result<Self> {
        let counter = VisitCounter::load(&config.crawler.counter_path)?;
        tracing::info!("Visit counter starts at {}", counter.value());

        let frontier = Arc::new(Frontier::new());
        for seed in &config.seeds {
            frontier.push(seed.clone());
        }

        Ok(Self {
            rules: Arc::new(rules),
            dedup: Arc::new(DedupFilter::new(config.crawler.dedup_bits)),
            frontier,
            counter,
            fetcher,
            stop: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(EngineState::Idle as u8)),
            fetch_timeout: Duration::from_millis(config.crawler.fetch_timeout_ms),
            page_delay: Duration::from_millis(config.crawler.page_delay_ms),
        })
    }

    /// Handle for stopping the engine and submitting URLs from outside.
    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            stop: Arc::clone(&self.stop),
            frontier: Arc::clone(&self.frontier),
            state: Arc::clone(&self.state),
        }
    }

    /// Completed visits so far.
    pub fn visits(&self) -> u64 {
        self.counter.value()
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Runs the crawl loop until the stop signal is observed.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Starting crawl loop: {} rules, {} queued seeds",
            self.rules.len(),
            self.frontier.len()
        );

        loop {
            self.set_state(EngineState::Idle);

            if self.stop.load(Ordering::Acquire) {
                break;
            }

            // The loop's only suspension points are this dequeue, the fetch,
            // and the pacing sleep.
            let Some(url) = self.frontier.next().await else {
                break;
            };

            if self.dedup.might_contain(&url) {
                tracing::debug!("Skip already visited url: {}", url);
                continue;
            }

            match self.visit(&url).await {
                Ok(completed) => {
                    if completed {
                        self.dedup.mark_seen(&url);
                        if let Err(e) = self.counter.increment() {
                            tracing::error!("Visit counter persist failed: {}", e);
                            self.set_state(EngineState::Stopped);
                            return Err(e.into());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping {} after error: {}", url, e);
                    self.dedup.mark_seen(&url);
                }
            }
        }

        self.set_state(EngineState::Stopped);
        tracing::info!("Crawl loop stopped after {} visits", self.counter.value());
        Ok(())
    }

    /// Processes one dequeued URL.
    ///
    /// Returns `Ok(true)` for a completed visit, `Ok(false)` when no rule
    /// governs the URL (which is a skip, not a visit).
    async fn visit(&mut self, url_str: &str) -> Result<bool> {
        let url = Url::parse(url_str)
            .map_err(|e| SpiderError::Url(UrlError::InvalidUrl(format!("{url_str}: {e}"))))?;

        let Some(rule) = self.rules.find_rule(&url) else {
            tracing::warn!("No rule matched, skip url: {}", url_str);
            // Deliberately narrow: only the raw path is marked, not the full URL.
            self.dedup.mark_seen(url.path());
            return Ok(false);
        };
        tracing::debug!("Rule {:?} governs {}", rule.name, url_str);

        // Per-visit parameters available to appendInfo processors.
        let mut params = HashMap::new();
        params.insert("url".to_string(), url_str.to_string());

        self.set_state(EngineState::Fetching);
        let page = self.fetcher.fetch(url_str, self.fetch_timeout).await?;

        // Politeness floor: pace this worker after every fetch.
        tokio::time::sleep(self.page_delay).await;

        self.set_state(EngineState::Extracting);
        let record = {
            let html = Html::parse_document(&page.body);
            pipeline::run(&rule, &html, &url, &params, &self.dedup, &self.frontier)
        };

        self.set_state(EngineState::Finalizing);
        if record.is_empty() {
            tracing::debug!("Empty extraction for {}, record discarded", url_str);
        } else if let Err(e) = rule.sink.save(&record) {
            // Fire-and-forget: persistence problems are the sink's concern.
            tracing::error!("Sink failed for {}: {}", url_str, e);
        }

        Ok(true)
    }
}
