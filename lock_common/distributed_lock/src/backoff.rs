/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::time::Duration;
use log::trace;
use rand::{thread_rng, Rng};

type DurationFloat = f64;

/// Bounded exponential backoff with jitter for acquisition retries.
///
/// Every delay is drawn uniformly from `[last, last * mult)`; once that range
/// would pass `max` it is pinned to `[max / mult, max)`.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    min: DurationFloat,
    max: DurationFloat,
    last: DurationFloat,
    mult: DurationFloat,
}

impl Backoff {
    pub(crate) fn new(min: Duration, max: Duration, mult: DurationFloat) -> Self {
        let min = min.as_secs_f64();
        Self {
            min,
            max: max.as_secs_f64().max(min),
            mult: mult.max(1.0),
            last: min,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        self.last = self.random();
        Duration::from_secs_f64(self.last)
    }

    fn random(&self) -> DurationFloat {
        let min = self.last;
        let max = min * self.mult;

        let (min, max) = if max > self.max {
            ((self.max / self.mult).max(self.min), self.max)
        } else {
            (min, max)
        };

        if min >= max {
            return max;
        }

        let val = thread_rng().gen_range(min..max);
        trace!("backoff delay {:.3}s in [{:.3}, {:.3})", val, min, max);
        val
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_every_next_is_longer() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(10), 2.0);
        let mut prev = Duration::ZERO;

        for _ in 0..5 {
            let next = backoff.next_delay();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn delays_stay_within_bounds() {
        let min = Duration::from_millis(50);
        let max = Duration::from_millis(400);
        let mut backoff = Backoff::new(min, max, 2.0);

        let slack = Duration::from_micros(1);
        for _ in 0..50 {
            let next = backoff.next_delay();
            assert!(next + slack >= min && next <= max + slack, "{next:?} out of bounds");
        }
    }

    #[test]
    fn equal_bounds_give_fixed_delay() {
        let mut backoff = Backoff::new(Duration::from_millis(20), Duration::from_millis(20), 2.0);
        for _ in 0..3 {
            let fixed = backoff.next_delay().as_micros();
            assert!((19_999..=20_001).contains(&fixed));
        }
    }
}
