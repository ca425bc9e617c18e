/// Learning-to-rank model evaluation
///
/// Evaluates an additive ensemble of regression trees loaded from a JSON
/// export. Tree data comes from outside the process and is treated as
/// untrusted: indices may be out of range and child links may form cycles.
/// Every malformed walk scores 0 instead of failing the ranking pass.
pub mod features;

pub use features::{build_features, LTR_FEATURE_NAMES};

use crate::error::{RankingError, Result};
use crate::metrics;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Widest feature row a model may declare.
pub const MAX_LTR_FEATURES: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LtrTreeNode {
    #[serde(default)]
    pub feature_index: i64,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left_child: i64,
    #[serde(default)]
    pub right_child: i64,
    #[serde(default)]
    pub leaf_value: f64,
    #[serde(default)]
    pub is_leaf: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LtrModel {
    #[serde(default)]
    pub trees: Vec<Vec<LtrTreeNode>>,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub num_features: usize,
}

/// Walk one tree from node 0.
///
/// `<=` goes left, `>` goes right. The walk is capped at `nodes.len()`
/// steps, the longest root-to-leaf path a well-formed tree can have, so a
/// cyclic tree exhausts the budget and scores 0.
pub fn score_tree(nodes: &[LtrTreeNode], features: &[f64]) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }

    let mut idx = 0usize;
    for _ in 0..nodes.len() {
        let node = &nodes[idx];
        if node.is_leaf {
            return node.leaf_value;
        }

        let value = match in_bounds(node.feature_index, features.len()) {
            Some(feature) => features[feature],
            None => return malformed("feature_out_of_range"),
        };

        let next = if value <= node.threshold {
            node.left_child
        } else {
            node.right_child
        };
        idx = match in_bounds(next, nodes.len()) {
            Some(child) => child,
            None => return malformed("child_out_of_range"),
        };
    }

    malformed("step_budget")
}

fn in_bounds(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

/// Hot path: counted only. Defects are logged once per model at load time.
fn malformed(reason: &str) -> f64 {
    metrics::record_malformed_tree(reason);
    0.0
}

/// First structural defect reachable from the root, if any.
fn tree_defect(nodes: &[LtrTreeNode], width: usize) -> Option<&'static str> {
    if nodes.is_empty() {
        return None;
    }

    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![0usize];
    while let Some(idx) = stack.pop() {
        if visited[idx] {
            return Some("cycle");
        }
        visited[idx] = true;

        let node = &nodes[idx];
        if node.is_leaf {
            continue;
        }
        if in_bounds(node.feature_index, width).is_none() {
            return Some("feature_out_of_range");
        }
        let (left, right) = match (
            in_bounds(node.left_child, nodes.len()),
            in_bounds(node.right_child, nodes.len()),
        ) {
            (Some(left), Some(right)) => (left, right),
            _ => return Some("child_out_of_range"),
        };
        stack.push(left);
        if right != left {
            stack.push(right);
        }
    }
    None
}

impl LtrModel {
    /// Load a model exported as `{trees, feature_names, num_features}`.
    ///
    /// A declared width above [`MAX_LTR_FEATURES`] is rejected. Trees with
    /// structural defects are kept (they score 0) and reported once here.
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let model: LtrModel = serde_json::from_str(&raw)?;

        if model.num_features > MAX_LTR_FEATURES {
            return Err(RankingError::ModelParse(format!(
                "num_features {} exceeds the limit of {}",
                model.num_features, MAX_LTR_FEATURES
            )));
        }
        if model.num_features > 0 && model.num_features != LTR_FEATURE_NAMES.len() {
            warn!(
                declared = model.num_features,
                known = LTR_FEATURE_NAMES.len(),
                "LTR model feature count differs from the known layout"
            );
        }

        let defects = model.defective_trees();
        if let Some((first_tree, reason)) = defects.first() {
            warn!(
                path = %path.display(),
                defective = defects.len(),
                first_tree,
                reason,
                "LTR model contains malformed trees, they will score 0"
            );
        }

        info!(
            path = %path.display(),
            trees = model.trees.len(),
            features = model.num_features,
            "LTR model loaded"
        );
        Ok(model)
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Width of the feature vector this model expects, never above
    /// [`MAX_LTR_FEATURES`].
    pub fn feature_count(&self) -> usize {
        if self.num_features > 0 {
            self.num_features.min(MAX_LTR_FEATURES)
        } else {
            LTR_FEATURE_NAMES.len()
        }
    }

    /// `(tree index, reason)` for every tree that cannot be walked cleanly.
    pub fn defective_trees(&self) -> Vec<(usize, &'static str)> {
        let width = self.feature_count();
        self.trees
            .iter()
            .enumerate()
            .filter_map(|(i, tree)| tree_defect(tree, width).map(|reason| (i, reason)))
            .collect()
    }

    /// Sum of all tree outputs. 0 for an empty model or empty features.
    pub fn score(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() || features.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|tree| score_tree(tree, features)).sum()
    }

    /// Score every row of a (batch_size × feature_count) matrix.
    pub fn score_batch(&self, features: &Array2<f64>) -> Array1<f64> {
        features
            .rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(slice) => self.score(slice),
                None => self.score(&row.to_vec()),
            })
            .collect()
    }
}
