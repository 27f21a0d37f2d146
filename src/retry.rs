// Copyright Materialize, Inc. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::GraphErrorInfo;

/// The longest delay the planner will ever return by default.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);

/// Computes how long to wait before retrying a failed Graph API call.
///
/// A server-provided `Retry-After` is always honored: the planner only ever
/// adds to it. Without one, the planner falls back to quadratic backoff with
/// symmetric jitter.
#[derive(Debug, Clone)]
pub struct RetryPlanner {
    retry_after_jitter: f64,
    backoff_jitter: f64,
    max_delay: Duration,
}

impl Default for RetryPlanner {
    fn default() -> RetryPlanner {
        RetryPlanner {
            retry_after_jitter: 0.25,
            backoff_jitter: 0.25,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPlanner {
    /// Creates a planner with the default jitter and a 5 minute cap.
    pub fn new() -> RetryPlanner {
        RetryPlanner::default()
    }

    /// Sets the cap on backoff delays.
    ///
    /// The cap does not apply to a server-provided `Retry-After`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Returns the cap on backoff delays.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Computes the delay before retry number `attempt`, using the thread-local
    /// random number generator for jitter.
    ///
    /// `attempt` is 1-based. An `attempt` of zero is treated as one.
    pub fn compute_delay(&self, info: &GraphErrorInfo, attempt: u32) -> Duration {
        self.compute_delay_with_rng(info, attempt, &mut rand::thread_rng())
    }

    /// Like [`RetryPlanner::compute_delay`], but draws jitter from `rng`.
    pub fn compute_delay_with_rng<R>(
        &self,
        info: &GraphErrorInfo,
        attempt: u32,
        rng: &mut R,
    ) -> Duration
    where
        R: Rng,
    {
        if !info.retry_after.is_empty() {
            match parse_retry_after(&info.retry_after) {
                Some(retry_after) => {
                    let jitter =
                        retry_after.mul_f64(rng.gen_range(0.0..=self.retry_after_jitter));
                    let delay = retry_after + jitter;
                    debug!(
                        retry_after = %info.retry_after,
                        delay_ms = delay.as_millis() as u64,
                        "honoring Retry-After"
                    );
                    return delay;
                }
                None => warn!(
                    retry_after = %info.retry_after,
                    "unparseable Retry-After value, using exponential backoff"
                ),
            }
        }

        let attempt = u64::from(attempt.max(1));
        let base = attempt.saturating_mul(attempt) as f64;
        let jitter = rng.gen_range(-self.backoff_jitter..=self.backoff_jitter) * base;
        let mut delay = base + jitter;
        if delay < 0.0 {
            delay = base;
        }
        let delay = delay.min(self.max_delay.as_secs_f64());
        let delay = Duration::from_secs_f64(delay);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "computed backoff delay");
        delay
    }
}

/// Parses a `Retry-After` value.
///
/// Three forms are accepted, in order: a duration literal such as `"30s"` or
/// `"1m30s"`, a bare number of seconds such as `"30"`, and a phrase such as
/// `"30 seconds"` or `"1 second"`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(d) = parse_duration_literal(value) {
        return Some(d);
    }
    if let Some(d) = parse_duration_literal(&format!("{value}s")) {
        return Some(d);
    }
    let stripped = value
        .strip_suffix(" seconds")
        .or_else(|| value.strip_suffix(" second"))?;
    parse_duration_literal(&format!("{stripped}s"))
}

/// Parses a duration literal made of one or more decimal numbers, each with a
/// unit suffix, e.g. `"300ms"`, `"1.5h"` or `"2h45m"`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `"0"`
/// is accepted. Negative durations are rejected.
fn parse_duration_literal(s: &str) -> Option<Duration> {
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut rest = s;
    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." {
            return None;
        }
        let number: f64 = number.parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total_nanos += number * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(total_nanos.round() as u64))
}
