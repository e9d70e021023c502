use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use nantimmo_core::AppError;
use tokio_util::sync::CancellationToken;

use crate::runner::{Runner, print_summary};

/// How a failed run is retried within one period.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub retries: u32,
    pub delay: Duration,
}

/// The first occurrence of `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

/// Call `attempt` until it succeeds, fails with a non-retryable error, or
/// the policy runs out. Cancellation during a retry delay returns the last
/// error immediately.
pub async fn run_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut failures = 0;
    loop {
        let error = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !error.is_retryable() || failures >= policy.retries {
            return Err(error);
        }
        failures += 1;
        tracing::warn!(
            error = %error,
            attempt = failures,
            max_retries = policy.retries,
            delay_secs = policy.delay.as_secs(),
            "Run failed, retrying"
        );

        tokio::select! {
            () = tokio::time::sleep(policy.delay) => {}
            () = cancel.cancelled() => return Err(error),
        }
    }
}

/// Trigger `runner` once a day at `at` (process-local time) until cancelled.
pub async fn run_daily(
    runner: &Runner,
    at: NaiveTime,
    policy: RetryPolicy,
    cancel: CancellationToken,
) {
    tracing::info!(%at, retries = policy.retries, "Scheduler started");

    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next_run = %next, "Waiting for next scheduled run");

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = cancel.cancelled() => break,
        }

        match run_with_retries(&policy, &cancel, || runner.run_full_process()).await {
            Ok(summary) => print_summary(&summary),
            Err(e) => {
                tracing::error!(error = %e, "Scheduled run failed, giving up until next period")
            }
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    tracing::info!("Scheduler stopped");
}
