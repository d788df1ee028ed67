//! Best-K selection over accepted match results.

use crate::block::MatchResult;
use std::cmp::Ordering;

fn match_cmp_asc(a: &MatchResult, b: &MatchResult) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.position.y.cmp(&b.position.y))
        .then_with(|| a.position.x.cmp(&b.position.x))
}

/// Keeps the `k` accepted results with the smallest distances.
pub struct TopK {
    k: usize,
    items: Vec<MatchResult>,
}

impl TopK {
    /// Creates a new collector.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    /// Offers a result; rejected results are ignored.
    pub fn push(&mut self, result: MatchResult) {
        if self.k == 0 || !result.is_accepted() {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(result);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if match_cmp_asc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if match_cmp_asc(&result, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = result;
        }
    }

    /// Returns the kept results by ascending distance.
    pub fn into_sorted_asc(mut self) -> Vec<MatchResult> {
        self.items.sort_by(match_cmp_asc);
        self.items
    }
}

/// Returns up to `k` accepted results, best (smallest distance) first.
pub fn best_matches(results: &[MatchResult], k: usize) -> Vec<MatchResult> {
    let mut topk = TopK::new(k);
    for &result in results {
        topk.push(result);
    }
    topk.into_sorted_asc()
}
