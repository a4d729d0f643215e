use std::{fmt::Display, future::Future, time::Duration};

use tokio::time;

pub(crate) trait Transient {
	fn is_transient(&self) -> bool;
}
impl Transient for campus_providers::Error {
	fn is_transient(&self) -> bool {
		campus_providers::Error::is_transient(self)
	}
}
impl Transient for campus_storage::Error {
	fn is_transient(&self) -> bool {
		campus_storage::Error::is_transient(self)
	}
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
	pub(crate) max_attempts: u32,
	pub(crate) base_backoff: Duration,
	pub(crate) max_backoff: Duration,
	pub(crate) attempt_timeout: Duration,
}
impl RetryPolicy {
	pub(crate) fn new(cfg: &campus_config::Retry, attempt_timeout_ms: u64) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			base_backoff: Duration::from_millis(cfg.base_backoff_ms),
			max_backoff: Duration::from_millis(cfg.max_backoff_ms),
			attempt_timeout: Duration::from_millis(attempt_timeout_ms.max(1)),
		}
	}

	/// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt - 1)`, capped.
	pub(crate) fn backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1).min(16);

		self.base_backoff.saturating_mul(1_u32 << exponent).min(self.max_backoff)
	}
}

#[derive(Debug)]
pub(crate) enum AttemptFailure<E> {
	TimedOut(Duration),
	Failed(E),
}
impl<E> AttemptFailure<E>
where
	E: Transient,
{
	fn is_transient(&self) -> bool {
		match self {
			Self::TimedOut(_) => true,
			Self::Failed(err) => err.is_transient(),
		}
	}
}
impl<E> Display for AttemptFailure<E>
where
	E: Display,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::TimedOut(limit) => write!(f, "timed out after {} ms", limit.as_millis()),
			Self::Failed(err) => write!(f, "{err}"),
		}
	}
}

#[derive(Debug)]
pub(crate) struct RetryError<E> {
	pub(crate) attempts: u32,
	pub(crate) last: AttemptFailure<E>,
}

/// Runs `call` until it succeeds, fails permanently, or the attempt budget is spent. Every
/// attempt is bounded by the policy's timeout.
pub(crate) async fn with_retry<T, E, F, Fut>(
	policy: &RetryPolicy,
	operation: &'static str,
	mut call: F,
) -> Result<T, RetryError<E>>
where
	E: Transient + Display,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let mut attempt = 0;

	loop {
		attempt += 1;

		let failure = match time::timeout(policy.attempt_timeout, call()).await {
			Ok(Ok(value)) => return Ok(value),
			Ok(Err(err)) => AttemptFailure::Failed(err),
			Err(_) => AttemptFailure::TimedOut(policy.attempt_timeout),
		};
		let transient = failure.is_transient();

		tracing::warn!(
			operation,
			attempt,
			max_attempts = policy.max_attempts,
			transient,
			error = %failure,
			"Attempt failed."
		);

		if !transient || attempt >= policy.max_attempts {
			return Err(RetryError { attempts: attempt, last: failure });
		}

		time::sleep(policy.backoff(attempt)).await;
	}
}
