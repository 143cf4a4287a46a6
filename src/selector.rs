//! Operator selection strategies: uniform random and oracle/novelty-aware
//! meta-weighted.

use std::collections::HashMap;

use serde_json::Map;

use crate::novelty::NoveltyTracker;
use crate::operator::OperatorMeta;
use crate::registry::OperatorHandle;
use crate::rng::MtRng;
use crate::stats::StatsByBucket;

#[derive(Debug, Clone)]
pub struct Selection {
    pub op_id: String,
    pub params: Map<String, serde_json::Value>,
}

pub trait Selector {
    fn choose(
        &mut self,
        candidates: &[&OperatorHandle],
        bucket_id: &str,
        stats: &StatsByBucket,
        rng: &mut MtRng,
    ) -> Option<Selection>;
}

/// Picks uniformly among whatever the registry's `filter` already narrowed
/// down to (bucket, surface, risk ceiling).
pub struct UniformSelector;

impl Selector for UniformSelector {
    fn choose(
        &mut self,
        candidates: &[&OperatorHandle],
        _bucket_id: &str,
        _stats: &StatsByBucket,
        rng: &mut MtRng,
    ) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }
        let idx = rng.below(candidates.len());
        Some(Selection {
            op_id: candidates[idx].meta().op_id.clone(),
            params: Map::new(),
        })
    }
}

/// Weights each candidate by `bucket_multiplier * bucket_op_weight`, halving
/// the weight of whichever `op_id` was selected last for this bucket so a
/// single operator doesn't dominate a run. `bucket_op_weight` is the
/// operator's declared `risk_level` (HIGH outranks MEDIUM outranks LOW) —
/// the weight table is scoped to whatever set of operators the registry
/// actually carries, not a fixed external list.
pub struct MetaWeightedSelector {
    novelty: NoveltyTracker,
    bucket_multiplier: HashMap<String, f64>,
}

impl Default for MetaWeightedSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaWeightedSelector {
    pub fn new() -> Self {
        Self {
            novelty: NoveltyTracker::new(),
            bucket_multiplier: HashMap::new(),
        }
    }

    pub fn with_bucket_multiplier(mut self, bucket_id: impl Into<String>, multiplier: f64) -> Self {
        self.bucket_multiplier.insert(bucket_id.into(), multiplier);
        self
    }

    pub fn novelty(&self) -> &NoveltyTracker {
        &self.novelty
    }

    pub fn novelty_mut(&mut self) -> &mut NoveltyTracker {
        &mut self.novelty
    }

    fn base_weight(meta: &OperatorMeta) -> f64 {
        match meta.risk_level.as_str() {
            "HIGH" => 3.0,
            "MEDIUM" => 2.0,
            "LOW" => 1.0,
            _ => 1.0,
        }
    }
}

impl Selector for MetaWeightedSelector {
    fn choose(
        &mut self,
        candidates: &[&OperatorHandle],
        bucket_id: &str,
        stats: &StatsByBucket,
        rng: &mut MtRng,
    ) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }
        let multiplier = *self.bucket_multiplier.get(bucket_id).unwrap_or(&1.0);
        let last_selected = stats.last_selected(bucket_id).map(str::to_string);

        let weights: Vec<f64> = candidates
            .iter()
            .map(|h| {
                let mut w = Self::base_weight(h.meta()) * multiplier;
                if last_selected.as_deref() == Some(h.meta().op_id.as_str()) {
                    w *= 0.5;
                }
                w
            })
            .collect();

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Some(Selection {
                op_id: candidates[0].meta().op_id.clone(),
                params: Map::new(),
            });
        }

        let draw = rng.real01() * total;
        let mut cumulative = 0.0;
        for (handle, weight) in candidates.iter().zip(weights.iter()) {
            cumulative += weight;
            if draw < cumulative {
                return Some(Selection {
                    op_id: handle.meta().op_id.clone(),
                    params: Map::new(),
                });
            }
        }
        Some(Selection {
            op_id: candidates[candidates.len() - 1].meta().op_id.clone(),
            params: Map::new(),
        })
    }
}
