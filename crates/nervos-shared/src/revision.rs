//! Revision clock.
//!
//! One generator serves two purposes: it mints item ids and stamps every
//! edit with a revision. A value is `(ms since 2010-01-01) << 12 | seq`,
//! so it sorts like a timestamp and the originating millisecond can be
//! recovered with [`id_time`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

use crate::constants::{REVISION_EPOCH_MS, REVISION_SEQ_BITS};

const SEQ_MODULUS: i64 = 1 << REVISION_SEQ_BITS;

static SEQUENCE: AtomicI64 = AtomicI64::new(0);
static HIGH_WATER: AtomicI64 = AtomicI64::new(0);

/// Next revision/id for this process.
///
/// Strictly greater than every value previously returned by this process.
/// When more than 4096 values are requested within one millisecond the
/// result runs slightly ahead of the wall clock instead of repeating.
pub fn next_id() -> i64 {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let candidate = compose(Utc::now().timestamp_millis(), seq);

    let prev = HIGH_WATER
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(candidate.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    candidate.max(prev + 1)
}

/// Wall-clock millisecond a revision was minted in.
pub fn id_time(id: i64) -> DateTime<Utc> {
    let unix_ms = (id >> REVISION_SEQ_BITS) + REVISION_EPOCH_MS;
    Utc.timestamp_millis_opt(unix_ms)
        .single()
        .unwrap_or_default()
}

fn compose(unix_ms: i64, seq: i64) -> i64 {
    ((unix_ms - REVISION_EPOCH_MS) << REVISION_SEQ_BITS) | seq.rem_euclid(SEQ_MODULUS)
}
