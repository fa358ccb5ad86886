//! Regression tree grown by variance-reduction splits.
//!
//! Trees are stored as a flat node arena (root at index 0) so a fitted tree
//! serializes as plain data. Growing is deterministic given the RNG handed
//! in by the forest.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Hyperparameters for growing one tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered at each split.
    pub n_split_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on the rows selected by `indices` (with repetition, as
    /// produced by bootstrap sampling).
    pub fn fit(
        config: &TreeConfig,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = DecisionTree { nodes: Vec::new() };
        let mut indices = indices.to_vec();
        tree.grow(config, x, y, &mut indices, 0, rng);
        tree
    }

    /// Predict a single feature row.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes in the tree.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn grow(
        &mut self,
        config: &TreeConfig,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &mut [usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;

        if depth >= config.max_depth || indices.len() < 2 * config.min_samples_leaf {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        }

        let split = best_split(config, x, y, indices, rng);
        let Some((feature, threshold)) = split else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        let node_idx = self.nodes.len();
        // Placeholder; replaced once both children exist.
        self.nodes.push(Node::Leaf { value: mean });

        let mid = partition(x, indices, feature, threshold);
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.grow(config, x, y, left_indices, depth + 1, rng);
        let right = self.grow(config, x, y, right_indices, depth + 1, rng);

        self.nodes[node_idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_idx
    }
}

/// Find the (feature, threshold) with the highest sum-of-squares reduction
/// among a random feature subset, honouring the leaf-size minimum.
fn best_split(
    config: &TreeConfig,
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    rng: &mut StdRng,
) -> Option<(usize, f64)> {
    let n_features = x[0].len();
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(config.n_split_features.clamp(1, n_features));

    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let n = indices.len() as f64;
    let parent_sse = total_sq - total_sum * total_sum / n;

    let mut best: Option<(usize, f64)> = None;
    let mut best_reduction = 1e-12;

    for &feature in &features {
        let mut sorted: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (x[i][feature], y[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (pos, &(value, target)) in sorted.iter().enumerate().take(sorted.len() - 1) {
            left_sum += target;
            left_sq += target * target;

            let next_value = sorted[pos + 1].0;
            if value == next_value {
                continue;
            }

            let n_left = (pos + 1) as f64;
            let n_right = n - n_left;
            if (pos + 1) < config.min_samples_leaf
                || (sorted.len() - pos - 1) < config.min_samples_leaf
            {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left)
                + (right_sq - right_sum * right_sum / n_right);
            let reduction = parent_sse - sse;
            if reduction > best_reduction {
                best_reduction = reduction;
                best = Some((feature, (value + next_value) / 2.0));
            }
        }
    }

    best
}

/// Move indices with `x[i][feature] <= threshold` to the front; returns the
/// boundary position.
fn partition(x: &[Vec<f64>], indices: &mut [usize], feature: usize, threshold: f64) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if x[indices[i]][feature] <= threshold {
            indices.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn config() -> TreeConfig {
        TreeConfig {
            max_depth: 8,
            min_samples_leaf: 1,
            n_split_features: 2,
        }
    }

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 100 for x0 < 5, 200 otherwise; x1 is noise.
        let x: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, (i * 7 % 3) as f64])
            .collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 100.0 } else { 200.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_tree_learns_step_function() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let tree = DecisionTree::fit(&config(), &x, &y, &indices, &mut rng);

        for (row, &target) in x.iter().zip(y.iter()) {
            assert!((tree.predict(row) - target).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![5.0, 5.0, 5.0];
        let indices = vec![0, 1, 2];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&config(), &x, &y, &indices, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert!((tree.predict(&[9.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let coarse = TreeConfig {
            max_depth: 8,
            min_samples_leaf: 5,
            n_split_features: 2,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let tree = DecisionTree::fit(&coarse, &x, &y, &indices, &mut rng);
        // One split at the step boundary is the only legal one.
        assert_eq!(tree.n_nodes(), 3);
    }

    #[test]
    fn test_fit_is_deterministic_for_same_seed() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let t1 = DecisionTree::fit(&config(), &x, &y, &indices, &mut StdRng::seed_from_u64(3));
        let t2 = DecisionTree::fit(&config(), &x, &y, &indices, &mut StdRng::seed_from_u64(3));
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_bootstrap_indices_with_repeats() {
        let (x, y) = step_data();
        let indices = vec![0, 0, 1, 2, 8, 8, 9];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&config(), &x, &y, &indices, &mut rng);
        assert!((tree.predict(&x[0]) - 100.0).abs() < 1e-9);
        assert!((tree.predict(&x[9]) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_serialization_round_trip() {
        let (x, y) = step_data();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let tree = DecisionTree::fit(&config(), &x, &y, &indices, &mut rng);

        let bytes = bincode::serialize(&tree).unwrap();
        let restored: DecisionTree = bincode::deserialize(&bytes).unwrap();
        assert_eq!(tree, restored);
    }
}
