//! Invocation deadline handling.
//!
//! A handler must produce its terminal result before the Lambda runtime kills
//! it, so the handler work is raced against a timer set to the remaining
//! budget minus a safety margin. Whichever branch settles first wins and the
//! other is dropped, which cancels it at its next suspension point.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

pub const DEADLINE_SAFETY_MARGIN: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Processing the event timed out")]
pub struct DeadlineExceeded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationBudget(Duration);

impl InvocationBudget {
    pub fn new(remaining: Duration) -> Self {
        Self(remaining)
    }

    /// Budget left before `deadline_ms` (epoch milliseconds) as seen at
    /// `now_ms`, minus [`DEADLINE_SAFETY_MARGIN`]. Never negative.
    pub fn until_deadline(deadline_ms: u64, now_ms: i64) -> Self {
        let now_ms = u64::try_from(now_ms).unwrap_or(0);
        let remaining = Duration::from_millis(deadline_ms.saturating_sub(now_ms));
        Self(remaining.saturating_sub(DEADLINE_SAFETY_MARGIN))
    }

    pub fn remaining(&self) -> Duration {
        self.0
    }
}

/// Identity and time budget of the current Lambda invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub request_id: String,
    pub budget: InvocationBudget,
}

impl Invocation {
    pub fn new(request_id: impl Into<String>, budget: InvocationBudget) -> Self {
        Self {
            request_id: request_id.into(),
            budget,
        }
    }

    pub fn from_context(context: &lambda_runtime::Context) -> Self {
        Self::new(
            context.request_id.clone(),
            InvocationBudget::until_deadline(context.deadline, Utc::now().timestamp_millis()),
        )
    }
}

pub async fn race_deadline<F>(
    budget: InvocationBudget,
    work: F,
) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    let timer = tokio::time::sleep(budget.remaining());

    // Timer first: an exhausted budget never starts the work.
    tokio::select! {
        biased;
        () = timer => {
            tracing::warn!(
                budget_ms = budget.remaining().as_millis() as u64,
                "invocation budget exhausted before the handler settled"
            );
            Err(DeadlineExceeded)
        }
        output = work => Ok(output),
    }
}
