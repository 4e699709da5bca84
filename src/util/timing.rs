// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::info;

/// Wrapper function to measure duration of an async operation
///
/// Logs `"{metric_name} | {log_line}, took={ms}"` where `log_line` is produced
/// by `trace_log_fn` from a successful result.
pub async fn measure_dur_async<F, Fut, T, E>(
    metric_name: &str,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> (Result<T, E>, Duration)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = SystemTime::now();
    let result = operation().await;
    let dur = start.elapsed().unwrap_or_else(|_| Duration::from_millis(0));
    let log_line = result
        .as_ref()
        .ok()
        .and_then(|r| trace_log_fn.map(|f| f(r)))
        .unwrap_or_default();
    info!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
    (result, dur)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(v: &i32) -> String {
        format!("value={}", v)
    }

    #[tokio::test]
    async fn test_measure_dur_async_ok() {
        let (result, _dur) = measure_dur_async(
            "op",
            || async { Ok::<i32, String>(42) },
            Some(describe as fn(&i32) -> String),
        )
        .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_measure_dur_async_err() {
        let (result, _dur) =
            measure_dur_async("op", || async { Err::<i32, _>("failed") }, None).await;
        assert_eq!(result, Err("failed"));
    }
}
