//! Per-bucket, per-operator outcome tracking and the FIFO of recently
//! selected operators the anti-repetition penalty consults.

use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{json, Value};

const RECENT_OPS_CAPACITY: usize = 20;
const EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Unknown,
}

/// Running outcome counters for one `(bucket_id, op_id)` pair.
///
/// `avg_oracle_score` is the plain online mean; `oracle_score_ema` is an
/// exponential moving average over the same samples, weighting recent
/// results more heavily so a selector can react to an operator's oracle
/// score drifting within a single run rather than only across the whole
/// history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpBucketStats {
    pub n: u64,
    pub n_pass: u64,
    pub n_fail: u64,
    pub n_unknown: u64,
    pub n_score: u64,
    pub avg_oracle_score: f64,
    pub oracle_score_ema: f64,
    pub last_updated_ts: u64,
}

impl OpBucketStats {
    pub fn update(&mut self, verdict: Verdict, oracle_score: Option<f64>) {
        self.n += 1;
        match verdict {
            Verdict::Pass => self.n_pass += 1,
            Verdict::Fail => self.n_fail += 1,
            Verdict::Unknown => self.n_unknown += 1,
        }
        if let Some(score) = oracle_score {
            self.n_score += 1;
            self.avg_oracle_score += (score - self.avg_oracle_score) / self.n_score as f64;
            self.oracle_score_ema = if self.n_score == 1 {
                score
            } else {
                EMA_ALPHA * score + (1.0 - EMA_ALPHA) * self.oracle_score_ema
            };
        }
        self.last_updated_ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    pub fn pass_rate(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.n_pass as f64 / self.n as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct StatsByBucket {
    stats: HashMap<String, HashMap<String, OpBucketStats>>,
    recent_ops: HashMap<String, VecDeque<String>>,
}

impl StatsByBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, bucket_id: &str, op_id: &str) -> &mut OpBucketStats {
        self.stats
            .entry(bucket_id.to_string())
            .or_default()
            .entry(op_id.to_string())
            .or_default()
    }

    pub fn get(&self, bucket_id: &str, op_id: &str) -> Option<&OpBucketStats> {
        self.stats.get(bucket_id).and_then(|by_op| by_op.get(op_id))
    }

    pub fn report_result(&mut self, bucket_id: &str, op_id: &str, verdict: Verdict, oracle_score: Option<f64>) {
        self.ensure(bucket_id, op_id).update(verdict, oracle_score);
    }

    /// Push `op_id` onto the bucket's recent-selection FIFO, capped at 20.
    pub fn push_recent_op(&mut self, bucket_id: &str, op_id: &str) {
        let queue = self.recent_ops.entry(bucket_id.to_string()).or_default();
        queue.push_back(op_id.to_string());
        while queue.len() > RECENT_OPS_CAPACITY {
            queue.pop_front();
        }
    }

    pub fn recent_ops(&self, bucket_id: &str) -> Vec<String> {
        self.recent_ops
            .get(bucket_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_selected(&self, bucket_id: &str) -> Option<&str> {
        self.recent_ops.get(bucket_id).and_then(|q| q.back()).map(String::as_str)
    }

    pub fn dump_json(&self) -> Value {
        json!({ "by_bucket": self.stats, "recent_ops": self.recent_ops.iter().map(|(k, v)| (k.clone(), v.iter().cloned().collect::<Vec<_>>())).collect::<HashMap<_, _>>() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tracks_verdict_counts() {
        let mut stats = OpBucketStats::default();
        stats.update(Verdict::Pass, None);
        stats.update(Verdict::Fail, None);
        stats.update(Verdict::Pass, None);
        assert_eq!(stats.n, 3);
        assert_eq!(stats.n_pass, 2);
        assert_eq!(stats.n_fail, 1);
        assert!((stats.pass_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn oracle_score_mean_and_ema_update() {
        let mut stats = OpBucketStats::default();
        stats.update(Verdict::Pass, Some(1.0));
        stats.update(Verdict::Pass, Some(0.0));
        assert!((stats.avg_oracle_score - 0.5).abs() < 1e-9);
        assert!(stats.oracle_score_ema < 1.0 && stats.oracle_score_ema > 0.0);
    }

    #[test]
    fn recent_ops_fifo_caps_at_20() {
        let mut stats = StatsByBucket::new();
        for i in 0..25 {
            stats.push_recent_op("A", &format!("op.{i}"));
        }
        let recent = stats.recent_ops("A");
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0], "op.5");
        assert_eq!(stats.last_selected("A"), Some("op.24"));
    }

    #[test]
    fn unknown_bucket_op_has_no_stats() {
        let stats = StatsByBucket::new();
        assert!(stats.get("A", "op.x").is_none());
    }
}
