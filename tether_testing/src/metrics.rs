//! Debugging recorder helpers for metrics assertions.

use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, DebuggingRecorder, Snapshotter},
};
use rstest::fixture;

/// A [`DebuggingRecorder`] paired with its snapshotter.
pub struct RecorderHandle {
    /// Recorder to install with `metrics::with_local_recorder`.
    pub recorder: DebuggingRecorder,
    /// Reads back what the recorder captured.
    pub snapshotter: Snapshotter,
}

/// Fresh recorder for a single test.
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn recorder() -> RecorderHandle {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    RecorderHandle {
        recorder,
        snapshotter,
    }
}

/// Sum of all counters named `name` whose labels include every pair in
/// `labels`.
///
/// `snapshot` is the vector from a single `snapshot().into_vec()`: taking a
/// snapshot drains the recorder's counters, so look every value up in the
/// same one.
#[must_use]
pub fn counter_value<U, D>(
    snapshot: &[(CompositeKey, U, D, DebugValue)],
    name: &str,
    labels: &[(&str, &str)],
) -> u64 {
    matching(snapshot, name, labels)
        .map(|value| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

/// Last value of the gauge named `name` whose labels include every pair in
/// `labels`.
#[must_use]
pub fn gauge_value<U, D>(
    snapshot: &[(CompositeKey, U, D, DebugValue)],
    name: &str,
    labels: &[(&str, &str)],
) -> Option<f64> {
    matching(snapshot, name, labels)
        .filter_map(|value| match value {
            DebugValue::Gauge(gauge) => Some(gauge.0),
            _ => None,
        })
        .last()
}

fn matching<'a, U, D>(
    snapshot: &'a [(CompositeKey, U, D, DebugValue)],
    name: &'a str,
    labels: &'a [(&str, &str)],
) -> impl Iterator<Item = &'a DebugValue> + 'a {
    snapshot
        .iter()
        .filter(move |(key, _, _, _)| {
            key.key().name() == name
                && labels.iter().all(|(k, v)| {
                    key.key()
                        .labels()
                        .any(|label| label.key() == *k && label.value() == *v)
                })
        })
        .map(|(_, _, _, value)| value)
}
