//! Per-bucket content-hash novelty tracking.
//!
//! A child counts as novel for a bucket the first time its exact text is
//! seen under that bucket. Novelty is tracked unconditionally, whether or
//! not a selector consults it.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Clone, Default)]
pub struct BucketNoveltyStats {
    total: u64,
    unique: u64,
    seen_hits: u64,
    hashes: HashSet<String>,
}

impl BucketNoveltyStats {
    /// Record `text`, returning `true` if it had not been seen before in
    /// this bucket.
    pub fn mark(&mut self, text: &str) -> bool {
        self.total += 1;
        let hash = content_hash(text);
        if self.hashes.insert(hash) {
            self.unique += 1;
            true
        } else {
            self.seen_hits += 1;
            false
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn unique(&self) -> u64 {
        self.unique
    }

    pub fn seen_hits(&self) -> u64 {
        self.seen_hits
    }

    pub fn unique_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unique as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoveltyTracker {
    by_bucket: HashMap<String, BucketNoveltyStats>,
}

impl NoveltyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` under `bucket_id`, returning whether it was novel.
    pub fn mark_seen(&mut self, bucket_id: &str, text: &str) -> bool {
        self.by_bucket.entry(bucket_id.to_string()).or_default().mark(text)
    }

    pub fn snapshot_one(&self, bucket_id: &str) -> Option<&BucketNoveltyStats> {
        self.by_bucket.get(bucket_id)
    }

    pub fn snapshot(&self) -> &HashMap<String, BucketNoveltyStats> {
        &self.by_bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_novel_repeat_is_not() {
        let mut tracker = NoveltyTracker::new();
        assert!(tracker.mark_seen("A", "hello"));
        assert!(!tracker.mark_seen("A", "hello"));
        let stats = tracker.snapshot_one("A").unwrap();
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.unique(), 1);
        assert_eq!(stats.seen_hits(), 1);
        assert!((stats.unique_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn buckets_are_tracked_independently() {
        let mut tracker = NoveltyTracker::new();
        assert!(tracker.mark_seen("A", "x"));
        assert!(tracker.mark_seen("B", "x"));
        assert_eq!(tracker.snapshot_one("A").unwrap().unique(), 1);
        assert_eq!(tracker.snapshot_one("B").unwrap().unique(), 1);
    }

    #[test]
    fn empty_bucket_has_zero_ratio() {
        let tracker = NoveltyTracker::new();
        assert!(tracker.snapshot_one("nope").is_none());
    }
}
