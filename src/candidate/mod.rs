//! Caller-side selection over per-candidate results.

pub mod topk;

pub use topk::{best_matches, TopK};
