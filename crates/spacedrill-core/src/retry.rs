// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::thread::sleep;
use std::time::Duration;

use backon::BlockingRetryable;
use backon::ExponentialBuilder;

use crate::error::Error;
use crate::error::Fallible;

/// Exponential backoff starting at `backoff_ms`, giving up after
/// `max_retries` retries.
pub fn conflict_backoff(max_retries: u32, backoff_ms: u64) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(backoff_ms))
        .with_max_times(max_retries as usize)
}

/// Run `op`, retrying it with `backoff` while it fails on a write conflict.
/// Other errors are returned at once.
pub fn retry_conflicts<T>(
    backoff: ExponentialBuilder,
    what: &str,
    op: impl FnMut() -> Fallible<T>,
) -> Fallible<T> {
    op.retry(backoff)
        .sleep(sleep)
        .when(Error::is_retryable)
        .notify(|e, delay| log::warn!("{what}: {e}; retrying in {delay:?}"))
        .call()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_conflicts_until_success() {
        let mut calls = 0;
        let result = retry_conflicts(conflict_backoff(3, 0), "test", || {
            calls += 1;
            if calls < 3 {
                Err(Error::StoreConflict("busy".to_string()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Fallible<()> = retry_conflicts(conflict_backoff(2, 0), "test", || {
            calls += 1;
            Err(Error::StoreConflict("busy".to_string()))
        });
        assert!(matches!(result, Err(Error::StoreConflict(_))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_does_not_retry_other_errors() {
        let mut calls = 0;
        let result: Fallible<()> = retry_conflicts(conflict_backoff(5, 0), "test", || {
            calls += 1;
            Err(Error::NotFound("card".to_string()))
        });
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls, 1);
    }
}
