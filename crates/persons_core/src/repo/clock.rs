//! Audit timestamp source.
//!
//! Every call returns a Unix epoch millisecond value strictly greater than
//! any value previously returned in this process, so successive flushes that
//! touch the same entity always observe an increasing `updated_at`.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

pub fn next_timestamp() -> i64 {
    let wall = Utc::now().timestamp_millis();
    let previous = LAST_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(wall.max(last + 1))
        })
        .unwrap_or(wall);
    wall.max(previous + 1)
}
