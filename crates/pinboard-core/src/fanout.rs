use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::error::CoreError;

type UnitResult<T> = (&'static str, anyhow::Result<T>);

/// A group of independent blocking units sharing one deadline.
///
/// `join` waits for every unit. The first unit error, a panicked unit, or the
/// deadline aborts whatever is still pending and fails the whole group.
pub struct FanOut<T> {
    set: JoinSet<UnitResult<T>>,
    timeout: Duration,
    deadline: Instant,
}

impl<T: Send + 'static> FanOut<T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            set: JoinSet::new(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn spawn<F>(&mut self, unit: &'static str, f: F)
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.set.spawn_blocking(move || {
            debug!("Started unit {}", unit);
            let result = f();
            debug!("Finished unit {}", unit);
            (unit, result)
        });
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Results in completion order.
    pub async fn join(mut self) -> Result<Vec<(&'static str, T)>, CoreError> {
        let mut done = Vec::with_capacity(self.set.len());

        loop {
            let next = match timeout_at(self.deadline, self.set.join_next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(
                        "Fan-out deadline hit with {} unit(s) pending",
                        self.set.len()
                    );
                    self.set.abort_all();
                    return Err(CoreError::Deadline(self.timeout));
                }
            };

            match next {
                None => return Ok(done),
                Some(Ok((unit, Ok(value)))) => done.push((unit, value)),
                Some(Ok((unit, Err(cause)))) => {
                    warn!("Unit {} failed: {:#}", unit, cause);
                    self.set.abort_all();
                    return Err(CoreError::Aggregate { unit, cause });
                }
                Some(Err(join_err)) => {
                    warn!("Unit task did not complete: {}", join_err);
                    self.set.abort_all();
                    return Err(CoreError::Aggregate {
                        unit: "task",
                        cause: anyhow::anyhow!("unit task did not complete: {}", join_err),
                    });
                }
            }
        }
    }
}
