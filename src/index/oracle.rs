//! Concurrent latest-version checks.
//!
//! A fixed pool of workers pulls packages from a shared cursor. Every
//! request start goes through one [`RateLimiter`], so the spacing holds no
//! matter how many workers run. Results are handed to the caller on the
//! calling thread as they complete.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use super::{compare_versions, IndexClient, IndexError, IndexSettings, RateLimiter, StatusUpdate};
use crate::inventory::Package;
use crate::session::CancelToken;

/// What happened during one update check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Packages the index answered for.
    pub checked: usize,
    /// Packages whose query failed.
    pub failed: usize,
    /// Packages never queried (failure limit or deadline).
    pub skipped: usize,
    /// The index kept failing and the check stopped early.
    pub aborted: bool,
    /// The deadline passed before all packages were queried.
    pub deadline_reached: bool,
    pub cancelled: bool,
}

enum Outcome {
    Answered(StatusUpdate),
    Failed(StatusUpdate, IndexError),
}

pub struct UpdateOracle {
    client: Arc<dyn IndexClient>,
    settings: IndexSettings,
}

impl UpdateOracle {
    pub fn new(client: Arc<dyn IndexClient>, settings: IndexSettings) -> Self {
        Self { client, settings }
    }

    /// Query one package and classify it.
    pub fn check_one(&self, package: &Package) -> Result<StatusUpdate, IndexError> {
        let latest = self.client.latest_version(&package.name)?;
        Ok(StatusUpdate {
            name: package.name.clone(),
            status: compare_versions(&package.version, &latest),
            latest: Some(latest),
        })
    }

    /// Check every package, calling `on_result` once per package.
    ///
    /// Failed and skipped packages are reported as unknown. After
    /// cancellation nothing further is reported.
    pub fn check<F>(&self, packages: &[Package], cancel: &CancelToken, mut on_result: F) -> CheckReport
    where
        F: FnMut(StatusUpdate),
    {
        let mut report = CheckReport::default();
        if packages.is_empty() {
            return report;
        }

        let started = Instant::now();
        let deadline = started + self.settings.deadline;
        let limiter = RateLimiter::new(self.settings.min_interval);
        let cursor = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let deadline_hit = AtomicBool::new(false);
        let done: Vec<AtomicBool> = packages.iter().map(|_| AtomicBool::new(false)).collect();
        let workers = self.settings.max_parallel.clamp(1, packages.len());

        tracing::info!(
            "Checking {} packages with {} workers",
            packages.len(),
            workers
        );

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<Outcome>();
            for _ in 0..workers {
                let tx = tx.clone();
                let (limiter, cursor, stop, deadline_hit, done) =
                    (&limiter, &cursor, &stop, &deadline_hit, &done);
                scope.spawn(move || loop {
                    if cancel.is_cancelled() || stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if Instant::now() >= deadline {
                        deadline_hit.store(true, Ordering::SeqCst);
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(package) = packages.get(index) else {
                        break;
                    };
                    if !limiter.acquire(cancel) {
                        break;
                    }
                    done[index].store(true, Ordering::SeqCst);
                    let outcome = match self.check_one(package) {
                        Ok(update) => Outcome::Answered(update),
                        Err(err) => Outcome::Failed(StatusUpdate::unknown(&package.name), err),
                    };
                    if tx.send(outcome).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            let mut consecutive_failures = 0;
            for outcome in rx {
                if cancel.is_cancelled() {
                    continue;
                }
                match outcome {
                    Outcome::Answered(update) => {
                        consecutive_failures = 0;
                        report.checked += 1;
                        on_result(update);
                    }
                    Outcome::Failed(update, err) => {
                        tracing::debug!("Update check for {} failed: {}", update.name, err);
                        report.failed += 1;
                        if err.is_outage() {
                            consecutive_failures += 1;
                        } else {
                            consecutive_failures = 0;
                        }
                        if consecutive_failures >= self.settings.failure_threshold
                            && !stop.swap(true, Ordering::SeqCst)
                        {
                            tracing::warn!(
                                "Stopping update check after {} consecutive failures",
                                consecutive_failures
                            );
                            report.aborted = true;
                        }
                        on_result(update);
                    }
                }
            }
        });

        if cancel.is_cancelled() {
            tracing::debug!("Update check cancelled");
            report.cancelled = true;
            return report;
        }

        for (package, _) in packages
            .iter()
            .zip(&done)
            .filter(|(_, done)| !done.load(Ordering::SeqCst))
        {
            report.skipped += 1;
            on_result(StatusUpdate::unknown(&package.name));
        }
        report.deadline_reached = deadline_hit.load(Ordering::SeqCst);
        if report.deadline_reached {
            tracing::warn!(
                "Update check deadline of {}s reached, {} packages not checked",
                self.settings.deadline.as_secs(),
                report.skipped
            );
        }

        tracing::info!(
            "Update check finished in {:.1}s: {} checked, {} failed, {} skipped",
            started.elapsed().as_secs_f64(),
            report.checked,
            report.failed,
            report.skipped
        );
        report
    }
}
