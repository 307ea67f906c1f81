//! Grouping resolved events into (location, category) buckets.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use event_map_analytics_models::{AggregateBucket, BucketKey, ResolvedEvent};
use rayon::prelude::*;

/// Default number of events per parallel shard.
pub const DEFAULT_SHARD_SIZE: usize = 2_048;

/// Buckets keyed by (location, category), iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateMap {
    buckets: BTreeMap<BucketKey, AggregateBucket>,
}

impl AggregateMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into its bucket, creating the bucket if needed.
    pub fn insert(&mut self, event: &ResolvedEvent) {
        match self.buckets.entry(event.key()) {
            Entry::Occupied(mut entry) => entry.get_mut().add(event),
            Entry::Vacant(entry) => {
                entry.insert(AggregateBucket::from_event(event));
            }
        }
    }

    /// Combines two maps. Associative and commutative.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for (key, bucket) in other.buckets {
            match self.buckets.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(&bucket),
                Entry::Vacant(entry) => {
                    entry.insert(bucket);
                }
            }
        }
        self
    }

    /// Looks up a bucket.
    #[must_use]
    pub fn get(&self, key: &BucketKey) -> Option<&AggregateBucket> {
        self.buckets.get(key)
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// `true` if there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in key order.
    pub fn buckets(&self) -> impl Iterator<Item = &AggregateBucket> {
        self.buckets.values()
    }

    /// Sum of all bucket counts.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.buckets.values().map(|bucket| bucket.count).sum()
    }
}

impl<'a> FromIterator<&'a ResolvedEvent> for AggregateMap {
    fn from_iter<I: IntoIterator<Item = &'a ResolvedEvent>>(iter: I) -> Self {
        let mut map = Self::new();
        for event in iter {
            map.insert(event);
        }
        map
    }
}

/// Aggregates events in a single sequential pass.
#[must_use]
pub fn aggregate(events: &[ResolvedEvent]) -> AggregateMap {
    events.iter().collect()
}

/// Aggregates events in shards of `shard_size` on the rayon pool, then
/// merges the shards.
///
/// Counts, sentiment tallies, timestamps and coordinates are identical to
/// [`aggregate`]. Intensity sums are added in a different order, so with
/// fractional intensities a bucket's `intensity_sum` (and mean) may differ
/// from the sequential result in the last few bits. Integer-valued
/// intensities sum exactly.
#[must_use]
pub fn aggregate_parallel(events: &[ResolvedEvent], shard_size: usize) -> AggregateMap {
    events
        .par_chunks(shard_size.max(1))
        .map(aggregate)
        .reduce(AggregateMap::new, AggregateMap::merge)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use event_map_event_models::{Category, Sentiment, SentimentLabel};
    use event_map_geography_models::{GeoPoint, MatchKind};
    use event_map_source_models::RawEvent;

    use super::*;

    const LOCATIONS: &[&str] = &["İstanbul", "Ankara", "İzmir", "41.50, 35.00"];
    const CATEGORIES: &[Category] = &[Category::Earthquake, Category::Flood, Category::Fire];
    const LABELS: &[Option<SentimentLabel>] = &[
        Some(SentimentLabel::Positive),
        Some(SentimentLabel::Neutral),
        Some(SentimentLabel::Negative),
        None,
    ];

    fn events(n: usize) -> Vec<ResolvedEvent> {
        (0..n)
            .map(|i| {
                let secs = i64::try_from(i).unwrap() * 37 % 5_000;
                ResolvedEvent {
                    event: RawEvent {
                        id: format!("e{i}"),
                        timestamp: DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap(),
                        geo: Some(GeoPoint::new(41.0, 29.0)),
                        free_text: None,
                        structured_category: None,
                        sentiment: LABELS[i % LABELS.len()]
                            .map(|label| Sentiment { label, score: 0.8 }),
                        intensity: (i % 3 != 0).then(|| f64::from(u32::try_from(i % 50).unwrap())),
                    },
                    location: LOCATIONS[i % LOCATIONS.len()].to_string(),
                    distance_km: Some(1.0),
                    match_kind: MatchKind::Gazetteer,
                    category: CATEGORIES[i % CATEGORIES.len()],
                    anchor: Some(GeoPoint::new(41.0, 29.0 + f64::from(u32::try_from(i % 7).unwrap()))),
                }
            })
            .collect()
    }

    #[test]
    fn counts_are_conserved() {
        let events = events(1_000);
        let map = aggregate(&events);
        assert_eq!(map.total_count(), 1_000);
        assert_eq!(map.len(), LOCATIONS.len() * CATEGORIES.len());
    }

    #[test]
    fn tallies_sum_to_count() {
        let map = aggregate(&events(500));
        for bucket in map.buckets() {
            assert_eq!(bucket.sentiment.total(), bucket.count, "{:?}", bucket.key());
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let events = events(10_000);
        let sequential = aggregate(&events);
        for shard_size in [1, 7, 512, 20_000] {
            assert_eq!(
                aggregate_parallel(&events, shard_size),
                sequential,
                "shard size {shard_size}"
            );
        }
    }

    #[test]
    fn parallel_fractional_means_agree_within_rounding() {
        let mut events = events(6_000);
        for (i, resolved) in events.iter_mut().enumerate() {
            resolved.event.intensity =
                Some(0.1 + f64::from(u32::try_from(i % 97).unwrap()) * 0.37);
        }
        let sequential = aggregate(&events);

        for shard_size in [1, 13, 1_000] {
            let parallel = aggregate_parallel(&events, shard_size);
            assert_eq!(parallel.len(), sequential.len());
            for bucket in sequential.buckets() {
                let other = parallel.get(&bucket.key()).unwrap();
                assert_eq!(other.count, bucket.count);
                assert_eq!(other.sentiment, bucket.sentiment);
                assert_eq!(other.intensity_count, bucket.intensity_count);
                assert_eq!(other.last_timestamp, bucket.last_timestamp);

                let expected = bucket.mean_intensity().unwrap();
                let actual = other.mean_intensity().unwrap();
                assert!(
                    (expected - actual).abs() <= 1e-9 * expected.abs().max(1.0),
                    "shard size {shard_size}: {expected} vs {actual}"
                );
            }
        }
    }

    #[test]
    fn merge_is_associative_and_commutative() {
        let events = events(300);
        let a = aggregate(&events[..100]);
        let b = aggregate(&events[100..200]);
        let c = aggregate(&events[200..]);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.clone().merge(b.clone().merge(c.clone()));
        let shuffled = c.merge(a).merge(b);

        assert_eq!(left, right);
        assert_eq!(left, shuffled);
        assert_eq!(left, aggregate(&events));
    }

    #[test]
    fn last_timestamp_is_newest_event() {
        let events = events(200);
        let map = aggregate(&events);
        for bucket in map.buckets() {
            let newest = events
                .iter()
                .filter(|e| e.key() == bucket.key())
                .map(|e| e.event.timestamp)
                .max();
            assert_eq!(Some(bucket.last_timestamp), newest);
        }
    }

    #[test]
    fn empty_input_gives_empty_map() {
        assert!(aggregate(&[]).is_empty());
        assert!(aggregate_parallel(&[], 16).is_empty());
    }
}
