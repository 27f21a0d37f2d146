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

//! Tests for retry delay planning.
//!
//! Jitter is random, so these tests draw it from seeded generators and assert
//! that delays fall within bounds.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use test_log::test;

use msgraph_errors::{GraphErrorInfo, RetryPlanner, DEFAULT_MAX_DELAY};

const SEEDS: u64 = 200;

fn with_retry_after(retry_after: &str) -> GraphErrorInfo {
    GraphErrorInfo {
        status_code: 429,
        retry_after: retry_after.into(),
        ..Default::default()
    }
}

#[test]
fn test_retry_after_seconds_is_a_minimum() {
    let planner = RetryPlanner::new();
    for n in [1, 5, 30, 120] {
        let info = with_retry_after(&n.to_string());
        for seed in 0..SEEDS {
            let mut rng = StdRng::seed_from_u64(seed);
            for attempt in [1, 3, 10] {
                let delay = planner.compute_delay_with_rng(&info, attempt, &mut rng);
                let min = Duration::from_secs(n);
                let max = Duration::from_secs(n).mul_f64(1.25);
                assert!(delay >= min && delay <= max, "{delay:?} for {n}s");
            }
        }
    }
}

#[test]
fn test_retry_after_phrase() {
    let planner = RetryPlanner::new();
    let info = with_retry_after("2 seconds");
    for seed in 0..SEEDS {
        let delay = planner.compute_delay_with_rng(&info, 1, &mut StdRng::seed_from_u64(seed));
        assert!(delay >= Duration::from_secs(2), "{delay:?}");
        assert!(delay <= Duration::from_millis(2500), "{delay:?}");
    }
}

#[test]
fn test_retry_after_duration_literal() {
    let planner = RetryPlanner::new();
    let info = with_retry_after("2m");
    let delay = planner.compute_delay_with_rng(&info, 1, &mut StdRng::seed_from_u64(7));
    assert!(delay >= Duration::from_secs(120) && delay <= Duration::from_secs(150));
}

#[test]
fn test_backoff_bounds() {
    let planner = RetryPlanner::new();
    let info = GraphErrorInfo {
        status_code: 503,
        ..Default::default()
    };
    for attempt in 1..=20u32 {
        let base = f64::from(attempt * attempt);
        let min = Duration::from_secs_f64(base * 0.75).min(DEFAULT_MAX_DELAY);
        let max = Duration::from_secs_f64(base * 1.25).min(DEFAULT_MAX_DELAY);
        for seed in 0..SEEDS {
            let mut rng = StdRng::seed_from_u64(seed);
            let delay = planner.compute_delay_with_rng(&info, attempt, &mut rng);
            assert!(
                delay >= min && delay <= max,
                "attempt {attempt}: {delay:?} not in [{min:?}, {max:?}]"
            );
        }
    }
}

#[test]
fn test_backoff_is_capped() {
    let planner = RetryPlanner::new();
    let info = GraphErrorInfo::default();
    for seed in 0..SEEDS {
        let delay = planner.compute_delay_with_rng(&info, 100, &mut StdRng::seed_from_u64(seed));
        assert!(delay <= Duration::from_secs(300), "{delay:?}");
    }
    assert!(planner.compute_delay(&info, u32::MAX) <= Duration::from_secs(300));
}

#[test]
fn test_custom_cap() {
    let planner = RetryPlanner::new().with_max_delay(Duration::from_secs(10));
    assert_eq!(planner.max_delay(), Duration::from_secs(10));
    let info = GraphErrorInfo::default();
    let delay = planner.compute_delay_with_rng(&info, 5, &mut StdRng::seed_from_u64(1));
    assert_eq!(delay, Duration::from_secs(10));
}

#[test]
fn test_malformed_retry_after_falls_back_to_backoff() {
    let planner = RetryPlanner::new();
    for retry_after in ["soon", "-5", "Wed, 21 Oct 2015 07:28:00 GMT", "5 minutes"] {
        let info = with_retry_after(retry_after);
        for seed in 0..SEEDS {
            let delay = planner.compute_delay_with_rng(&info, 2, &mut StdRng::seed_from_u64(seed));
            assert!(
                delay >= Duration::from_secs(3) && delay <= Duration::from_secs(5),
                "{retry_after:?}: {delay:?}"
            );
        }
    }
}

#[test]
fn test_zeroth_attempt_is_first_attempt() {
    let planner = RetryPlanner::new();
    let info = GraphErrorInfo::default();
    let delay = planner.compute_delay_with_rng(&info, 0, &mut StdRng::seed_from_u64(3));
    assert!(delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250));
}

#[test]
fn test_seeded_delays_are_reproducible() {
    let planner = RetryPlanner::new();
    let info = GraphErrorInfo::default();
    let a = planner.compute_delay_with_rng(&info, 4, &mut StdRng::seed_from_u64(42));
    let b = planner.compute_delay_with_rng(&info, 4, &mut StdRng::seed_from_u64(42));
    assert_eq!(a, b);
}
