//! In-memory trace storage keyed by trace id.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracefold_core::Segment;

/// Errors from trace store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Trace not found: {0}")]
    TraceNotFound(String),
}

/// Rule deciding when a trace counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// Finished once the latest-starting segment has an end time.
    #[default]
    LastSegmentClosed,
    /// Finished once every segment has an end time.
    AllSegmentsClosed,
}

/// All segments seen for one trace id, ordered by start date.
#[derive(Debug, Clone, Default)]
pub struct TraceAggregate {
    segments: Vec<Segment>,
    finished: bool,
    window_start: Option<DateTime<Utc>>,
    window_end: Option<DateTime<Utc>>,
}

impl TraceAggregate {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start and end of the trace as of the last finishing insert.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.finished {
            return None;
        }
        Some((self.window_start?, self.window_end?))
    }

    /// True if any segment carries the given extension key.
    pub fn any_segment_has(&self, key: &str) -> bool {
        self.segments.iter().any(|s| s.has_extension(key))
    }

    /// Inserts in start-date order and re-evaluates completion.
    ///
    /// Returns whether the window was (re)computed by this insert.
    fn insert(&mut self, segment: Segment, policy: CompletionPolicy) -> bool {
        let at = self
            .segments
            .partition_point(|s| s.start_date() < segment.start_date());
        self.segments.insert(at, segment);

        let closed = match policy {
            CompletionPolicy::LastSegmentClosed => self
                .segments
                .last()
                .is_some_and(|tail| tail.end_time().is_some()),
            CompletionPolicy::AllSegmentsClosed => {
                self.segments.iter().all(|s| s.end_time().is_some())
            }
        };

        // An open tail never clears a finished flag.
        if closed {
            self.finished = true;
            self.window_start = self.segments.first().map(Segment::start_date);
            self.window_end = self.segments.iter().filter_map(Segment::end_date).max();
        }

        closed
    }
}

/// Concurrent map from trace id to [`TraceAggregate`].
///
/// Each put runs under the shard guard of its trace, so insert and
/// completion check never interleave for the same trace.
#[derive(Debug, Default)]
pub struct TraceStore {
    traces: DashMap<String, TraceAggregate>,
    policy: CompletionPolicy,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CompletionPolicy) -> Self {
        Self {
            traces: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    /// Adds a segment to its trace, creating the trace on first sight.
    pub fn put(&self, segment: Segment) {
        let segment_id = segment.id().to_owned();
        let mut aggregate = self
            .traces
            .entry(segment.trace_id().to_owned())
            .or_default();

        let window_updated = aggregate.insert(segment, self.policy);

        tracing::debug!(
            trace_id = %aggregate.key(),
            segment_id = %segment_id,
            segments = aggregate.segments.len(),
            finished = aggregate.finished,
            window_updated,
            "Stored segment"
        );
    }

    /// Returns a snapshot of one trace.
    pub fn get(&self, trace_id: &str) -> Result<TraceAggregate, StoreError> {
        self.traces
            .get(trace_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::TraceNotFound(trace_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Visits every trace; each aggregate is seen whole, never mid-put.
    pub fn for_each_aggregate(&self, mut f: impl FnMut(&str, &TraceAggregate)) {
        for entry in self.traces.iter() {
            f(entry.key(), entry.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, start: f64, end: Option<f64>) -> Segment {
        Segment::new(id, "1-5f84c7a1-0000000000000000000000aa", "svc", start, end).unwrap()
    }

    fn starts(store: &TraceStore) -> Vec<f64> {
        store
            .get("1-5f84c7a1-0000000000000000000000aa")
            .unwrap()
            .segments()
            .iter()
            .map(Segment::start_time)
            .collect()
    }

    #[test]
    fn test_segments_stay_sorted_on_every_insert() {
        let store = TraceStore::new();
        let mut expected = Vec::new();

        for (i, start) in [30.0, 10.0, 20.0, 10.0, 5.0, 40.0].into_iter().enumerate() {
            store.put(segment(&format!("s{i}"), start, None));
            expected.push(start);
            expected.sort_by(f64::total_cmp);
            assert_eq!(starts(&store), expected);
        }
    }

    #[test]
    fn test_equal_start_dates_insert_left() {
        let store = TraceStore::new();
        store.put(segment("first", 10.0, None));
        store.put(segment("second", 10.0, None));

        let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
        let ids: Vec<&str> = trace.segments().iter().map(Segment::id).collect();
        assert_eq!(ids, ["second", "first"]);
    }

    #[test]
    fn test_finished_when_latest_segment_closes_in_any_order() {
        let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];
        for order in orders {
            let store = TraceStore::new();
            let segments = [
                segment("a", 10.0, None),
                segment("b", 20.0, None),
                segment("c", 30.0, Some(35.0)),
            ];
            for i in order {
                store.put(segments[i].clone());
            }

            let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
            assert!(trace.is_finished(), "order {order:?}");
            let (start, end) = trace.window().unwrap();
            assert_eq!(start.timestamp(), 10);
            assert_eq!(end.timestamp(), 35);
        }
    }

    #[test]
    fn test_open_latest_segment_keeps_trace_unfinished() {
        let store = TraceStore::new();
        store.put(segment("a", 30.0, None));
        store.put(segment("b", 10.0, Some(15.0)));
        store.put(segment("c", 20.0, Some(25.0)));

        let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
        assert!(!trace.is_finished());
        assert!(trace.window().is_none());
    }

    #[test]
    fn test_finished_flag_survives_later_open_segment() {
        let store = TraceStore::new();
        store.put(segment("a", 10.0, Some(50.0)));
        store.put(segment("b", 20.0, None));

        let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
        assert!(trace.is_finished());
        let (start, end) = trace.window().unwrap();
        assert_eq!((start.timestamp(), end.timestamp()), (10, 50));
    }

    #[test]
    fn test_window_end_is_latest_end_date() {
        let store = TraceStore::new();
        store.put(segment("a", 10.0, Some(90.0)));
        store.put(segment("b", 20.0, Some(30.0)));

        let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
        let (_, end) = trace.window().unwrap();
        assert_eq!(end.timestamp(), 90);
    }

    #[test]
    fn test_all_segments_closed_policy() {
        let store = TraceStore::with_policy(CompletionPolicy::AllSegmentsClosed);
        store.put(segment("a", 10.0, None));
        store.put(segment("b", 20.0, Some(30.0)));
        assert!(!store.get("1-5f84c7a1-0000000000000000000000aa").unwrap().is_finished());

        store.put(segment("a2", 10.0, Some(12.0)));
        assert!(!store.get("1-5f84c7a1-0000000000000000000000aa").unwrap().is_finished());
    }

    #[test]
    fn test_all_segments_closed_policy_finishes() {
        let store = TraceStore::with_policy(CompletionPolicy::AllSegmentsClosed);
        store.put(segment("b", 20.0, Some(45.0)));
        store.put(segment("a", 10.0, Some(30.0)));
        store.put(segment("c", 25.0, Some(40.0)));

        let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
        assert!(trace.is_finished());
        let (start, end) = trace.window().unwrap();
        assert_eq!((start.timestamp(), end.timestamp()), (10, 45));
    }

    #[test]
    fn test_get_unknown_trace() {
        let store = TraceStore::new();
        assert!(store.is_empty());
        assert!(matches!(
            store.get("1-00000000-missing"),
            Err(StoreError::TraceNotFound(id)) if id == "1-00000000-missing"
        ));
    }

    #[test]
    fn test_concurrent_puts_lose_nothing() {
        let store = TraceStore::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..50 {
                        let start = f64::from(i * 8 + worker);
                        store.put(segment(&format!("w{worker}-{i}"), start, Some(start + 1.0)));
                    }
                });
            }
        });

        assert_eq!(store.len(), 1);
        let observed = starts(&store);
        assert_eq!(observed.len(), 400);
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));

        let trace = store.get("1-5f84c7a1-0000000000000000000000aa").unwrap();
        let (start, end) = trace.window().unwrap();
        assert_eq!((start.timestamp(), end.timestamp()), (0, 400));
    }
}
