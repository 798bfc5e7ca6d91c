// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};

/// Abstracts "now" so the engine and store can be driven by a fake clock in
/// tests without real sleeps.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    /// Unix seconds, used for `Task::start_time`/`end_time`.
    fn unix_now(&self) -> i64 {
        self.now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
