//! Load traffic generator for the URL-shortening service.
//!
//! Independent of the verification harness: simulates many concurrently
//! active users against a live service, each cycling think-time waits and
//! weighted task picks. Shorten requests feed a per-user pool of issued
//! short codes; redirect lookups are biased toward the earliest entries of
//! that pool to emulate real-world popularity skew; a low-weight task
//! probes unregistered codes and expects a clean 404.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::Result;

const DOMAINS: &[&str] = &["example.com", "test.org", "demo.net"];
const PATHS: &[&str] = &["/page", "/article", "/product", "/blog"];
const URL_SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Task weights: shorten 2, redirect 10, invalid lookup 1.
const SHORTEN_WEIGHT: u32 = 2;
const REDIRECT_WEIGHT: u32 = 10;
const INVALID_WEIGHT: u32 = 1;
const TOTAL_WEIGHT: u32 = SHORTEN_WEIGHT + REDIRECT_WEIGHT + INVALID_WEIGHT;

/// Think-time bounds between tasks.
const THINK_MIN: Duration = Duration::from_millis(100);
const THINK_MAX: Duration = Duration::from_millis(300);

/// Options for one load run.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Base URL of the shortening service, e.g. `http://localhost:80`.
    pub host: String,
    /// Number of concurrently active simulated users.
    pub users: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// One of the three simulated-user tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Shorten,
    Redirect,
    InvalidLookup,
}

impl Task {
    /// Map a roll in `0..TOTAL_WEIGHT` to a task, frequency proportional
    /// to weight.
    fn from_roll(roll: u32) -> Self {
        debug_assert!(roll < TOTAL_WEIGHT);
        if roll < SHORTEN_WEIGHT {
            Self::Shorten
        } else if roll < SHORTEN_WEIGHT + REDIRECT_WEIGHT {
            Self::Redirect
        } else {
            Self::InvalidLookup
        }
    }
}

/// Pick a pool index under the 80/20 popularity rule.
///
/// The "hot" tier is the earliest fifth of the pool (at least one entry);
/// `hot` picks from it, otherwise from the remainder. A pool too small to
/// have a remainder falls back to the hot tier.
fn pick_pool_index(pool_len: usize, hot: bool, rng: &mut impl Rng) -> usize {
    debug_assert!(pool_len > 0);
    let hot_end = (pool_len / 5).max(1);
    if hot || hot_end >= pool_len {
        rng.random_range(0..hot_end)
    } else {
        rng.random_range(hot_end..pool_len)
    }
}

fn random_suffix(rng: &mut impl Rng, chars: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| *chars.choose(rng).unwrap_or(&b'a') as char)
        .collect()
}

fn synthetic_url(rng: &mut impl Rng) -> String {
    let domain = DOMAINS.choose(rng).unwrap_or(&DOMAINS[0]);
    let path = PATHS.choose(rng).unwrap_or(&PATHS[0]);
    let suffix = random_suffix(rng, URL_SUFFIX_CHARS, 8);
    format!("https://{domain}{path}/{suffix}")
}

/// Metrics shared across all simulated users.
#[derive(Debug, Default)]
pub struct LoadMetrics {
    shorten_ok: AtomicU64,
    shorten_failed: AtomicU64,
    redirect_ok: AtomicU64,
    redirect_failed: AtomicU64,
    invalid_ok: AtomicU64,
    invalid_failed: AtomicU64,
}

impl LoadMetrics {
    fn record(&self, task: Task, ok: bool) {
        let counter = match (task, ok) {
            (Task::Shorten, true) => &self.shorten_ok,
            (Task::Shorten, false) => &self.shorten_failed,
            (Task::Redirect, true) => &self.redirect_ok,
            (Task::Redirect, false) => &self.redirect_failed,
            (Task::InvalidLookup, true) => &self.invalid_ok,
            (Task::InvalidLookup, false) => &self.invalid_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            shorten_ok: self.shorten_ok.load(Ordering::Relaxed),
            shorten_failed: self.shorten_failed.load(Ordering::Relaxed),
            redirect_ok: self.redirect_ok.load(Ordering::Relaxed),
            redirect_failed: self.redirect_failed.load(Ordering::Relaxed),
            invalid_ok: self.invalid_ok.load(Ordering::Relaxed),
            invalid_failed: self.invalid_failed.load(Ordering::Relaxed),
        }
    }
}

/// Aggregated counts for one load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub shorten_ok: u64,
    pub shorten_failed: u64,
    pub redirect_ok: u64,
    pub redirect_failed: u64,
    pub invalid_ok: u64,
    pub invalid_failed: u64,
}

impl LoadSummary {
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.shorten_failed + self.redirect_failed + self.invalid_failed
    }

    pub fn print(&self) {
        println!("shorten:        {} ok, {} failed", self.shorten_ok, self.shorten_failed);
        println!("redirect:       {} ok, {} failed", self.redirect_ok, self.redirect_failed);
        println!("invalid lookup: {} ok, {} failed", self.invalid_ok, self.invalid_failed);
    }
}

/// Run the load generator to completion and return the aggregate summary.
pub async fn run_load(opts: &LoadOptions) -> Result<LoadSummary> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()?;
    let metrics = Arc::new(LoadMetrics::default());
    let base = opts.host.trim_end_matches('/').to_string();
    let deadline = tokio::time::Instant::now() + opts.duration;

    let mut workers = Vec::with_capacity(opts.users);
    for user in 0..opts.users {
        let client = client.clone();
        let metrics = Arc::clone(&metrics);
        let base = base.clone();
        workers.push(tokio::spawn(async move {
            simulate_user(user, &client, &base, &metrics, deadline).await;
        }));
    }
    // A panicked user forfeits its remaining traffic; the run goes on.
    let _ = futures::future::join_all(workers).await;

    Ok(metrics.summary())
}

/// One simulated user: think-time wait, weighted task pick, request,
/// response classification, until the deadline.
///
/// The short-code pool is task-local by construction: sharing it across
/// users would corrupt the popularity-tier selection.
async fn simulate_user(
    user: usize,
    client: &reqwest::Client,
    base: &str,
    metrics: &LoadMetrics,
    deadline: tokio::time::Instant,
) {
    let mut rng = StdRng::from_os_rng();
    let mut pool: Vec<String> = Vec::new();

    while tokio::time::Instant::now() < deadline {
        let think = rng.random_range(THINK_MIN.as_millis()..=THINK_MAX.as_millis()) as u64;
        tokio::time::sleep_until(
            (tokio::time::Instant::now() + Duration::from_millis(think)).min(deadline),
        )
        .await;
        if tokio::time::Instant::now() >= deadline {
            break;
        }

        match Task::from_roll(rng.random_range(0..TOTAL_WEIGHT)) {
            Task::Shorten => {
                let url = synthetic_url(&mut rng);
                let ok = shorten(client, base, &url, &mut pool).await;
                metrics.record(Task::Shorten, ok);
            }
            Task::Redirect => {
                if pool.is_empty() {
                    continue;
                }
                let idx = pick_pool_index(pool.len(), rng.random_bool(0.8), &mut rng);
                let code = pool[idx].clone();
                let ok = redirect(client, base, &code).await;
                metrics.record(Task::Redirect, ok);
            }
            Task::InvalidLookup => {
                let code = random_suffix(&mut rng, CODE_CHARS, 6);
                let ok = invalid_lookup(client, base, &code).await;
                metrics.record(Task::InvalidLookup, ok);
            }
        }
    }
    debug!(user, pool = pool.len(), "simulated user finished");
}

async fn shorten(
    client: &reqwest::Client,
    base: &str,
    url: &str,
    pool: &mut Vec<String>,
) -> bool {
    let response = client
        .post(format!("{base}/shorten"))
        .header("Content-Type", "text/plain")
        .body(url.to_string())
        .send()
        .await;
    match response {
        Ok(r) if r.status() == reqwest::StatusCode::OK => match r.text().await {
            Ok(code) => {
                pool.push(code);
                true
            }
            Err(_) => false,
        },
        _ => false,
    }
}

/// Success requires a redirect status and a present Location header; the
/// redirect is never followed.
async fn redirect(client: &reqwest::Client, base: &str, code: &str) -> bool {
    match client.get(format!("{base}/shorten/{code}")).send().await {
        Ok(r) => {
            r.status() == reqwest::StatusCode::FOUND
                && r.headers().contains_key(reqwest::header::LOCATION)
        }
        Err(_) => false,
    }
}

/// A lookup for a code that is (with overwhelming probability)
/// unregistered succeeds only on a clean 404.
async fn invalid_lookup(client: &reqwest::Client, base: &str, code: &str) -> bool {
    match client.get(format!("{base}/shorten/{code}")).send().await {
        Ok(r) => r.status() == reqwest::StatusCode::NOT_FOUND,
        Err(_) => false,
    }
}
