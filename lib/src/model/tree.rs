//! Regression trees and the exact greedy builder used by boosting.
//!
//! Trees are stored as a flat node array with the root at index 0. A split
//! sends a row left when `x[feature] < threshold`, right otherwise. Leaf values
//! are already scaled by the learning rate.

use crate::error::{PerfError, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Splits must improve the regularised objective by more than this.
const MIN_SPLIT_GAIN: f64 = 1e-6;

/// A single tree node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal node.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node with its (learning-rate scaled) output.
    Leaf { value: f64 },
}

/// An immutable trained regression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Predict the tree output for one feature row.
    pub fn predict(&self, features: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[feature] < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// All nodes, root first.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Check structural soundness of a tree read from storage.
    ///
    /// Children must point forward in the node array (the builder emits
    /// nodes in pre-order), which rules out cycles, and split features must
    /// be within `n_features`.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(PerfError::IncompatibleArtifact("empty tree".to_string()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(PerfError::IncompatibleArtifact(format!(
                            "non-finite leaf value at node {}",
                            i
                        )));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let in_bounds = |c: usize| c > i && c < self.nodes.len();
                    if feature >= n_features
                        || !threshold.is_finite()
                        || !in_bounds(left)
                        || !in_bounds(right)
                    {
                        return Err(PerfError::IncompatibleArtifact(format!(
                            "malformed split at node {}",
                            i
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Per-tree growth parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization (lambda).
    pub reg_lambda: f64,
    /// Minimum sum of hessians per child.
    pub min_child_weight: f64,
}

impl TreeParams {
    /// Split gain:
    ///
    /// ```text
    /// gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)]
    /// ```
    #[inline]
    fn split_gain(&self, gl: f64, hl: f64, gr: f64, hr: f64, gp: f64, hp: f64) -> f64 {
        let lambda = self.reg_lambda;
        0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - gp * gp / (hp + lambda))
    }

    /// Newton step leaf weight `-G / (H + λ)`.
    #[inline]
    fn leaf_weight(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        -grad_sum / (hess_sum + self.reg_lambda)
    }
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Builds one tree from gradient statistics by exact greedy search.
///
/// `sorted[f]` lists the rows in the current node ordered by feature `f`
/// (ties in original row order). Partitioning a node keeps every child list
/// sorted, so features are sorted once per fit rather than once per node.
pub(crate) struct TreeBuilder<'x, 'g> {
    pub x: ArrayView2<'x, f64>,
    pub grad: &'g [f64],
    pub hess: &'g [f64],
    pub params: TreeParams,
}

impl TreeBuilder<'_, '_> {
    pub fn build(&self, sorted: Vec<Vec<usize>>) -> RegressionTree {
        let mut nodes = Vec::new();
        self.grow(sorted, 0, &mut nodes);
        RegressionTree { nodes }
    }

    fn grow(&self, sorted: Vec<Vec<usize>>, depth: usize, nodes: &mut Vec<TreeNode>) -> usize {
        let idx = nodes.len();
        nodes.push(TreeNode::Leaf { value: 0.0 });

        let rows: &[usize] = sorted.first().map(Vec::as_slice).unwrap_or(&[]);
        let (g, h) = rows
            .iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]));
        let leaf = TreeNode::Leaf {
            value: self.params.leaf_weight(g, h) * self.params.learning_rate,
        };

        if depth >= self.params.max_depth || rows.len() < 2 {
            nodes[idx] = leaf;
            return idx;
        }
        let Some(split) = self.best_split(&sorted, g, h) else {
            nodes[idx] = leaf;
            return idx;
        };

        let mut left_sorted = Vec::with_capacity(sorted.len());
        let mut right_sorted = Vec::with_capacity(sorted.len());
        for list in sorted {
            let (l, r): (Vec<usize>, Vec<usize>) = list
                .into_iter()
                .partition(|&row| self.x[[row, split.feature]] < split.threshold);
            left_sorted.push(l);
            right_sorted.push(r);
        }

        let left = self.grow(left_sorted, depth + 1, nodes);
        let right = self.grow(right_sorted, depth + 1, nodes);
        nodes[idx] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    /// Best split over all features; the first candidate wins ties.
    fn best_split(&self, sorted: &[Vec<usize>], g_total: f64, h_total: f64) -> Option<SplitCandidate> {
        let min_weight = self.params.min_child_weight;
        let mut best: Option<SplitCandidate> = None;

        for (feature, list) in sorted.iter().enumerate() {
            let (mut gl, mut hl) = (0.0, 0.0);
            for w in 0..list.len().saturating_sub(1) {
                let row = list[w];
                gl += self.grad[row];
                hl += self.hess[row];

                let value = self.x[[row, feature]];
                let next = self.x[[list[w + 1], feature]];
                if value == next {
                    continue;
                }

                let (gr, hr) = (g_total - gl, h_total - hl);
                if hl < min_weight || hr < min_weight {
                    continue;
                }

                let gain = self.params.split_gain(gl, hl, gr, hr, g_total, h_total);
                if gain > MIN_SPLIT_GAIN && best.map_or(true, |b| gain > b.gain) {
                    // The threshold must separate `value` from `next` under `<`.
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid > value { mid } else { next };
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Row indices ordered by each feature column (stable; ties keep row order).
pub(crate) fn presort(x: ArrayView2<'_, f64>) -> Vec<Vec<usize>> {
    (0..x.ncols())
        .map(|f| {
            let mut idx: Vec<usize> = (0..x.nrows()).collect();
            idx.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
            idx
        })
        .collect()
}
