//! Isolation Forest
//!
//! Anomalies are easier to isolate and therefore end up with shorter average
//! path lengths across randomly built trees.

use fraudlens_core::FeatureMatrix;
use rand::Rng;

/// Euler–Mascheroni constant, used by the harmonic-number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// c(ψ) for the per-tree sample size, normalizes path lengths.
    avg_path_length: f64,
}

impl IsolationForest {
    /// Build `num_trees` trees, each on a `sample_size` subsample drawn without
    /// replacement.
    pub fn fit<R: Rng>(
        data: &FeatureMatrix,
        num_trees: usize,
        sample_size: usize,
        rng: &mut R,
    ) -> Self {
        let n = data.rows();
        let psi = sample_size.min(n).max(1);
        let max_depth = (psi as f64).log2().ceil().max(1.0) as usize;

        let trees = if n == 0 {
            Vec::new()
        } else {
            (0..num_trees.max(1))
                .map(|_| {
                    let mut sample = rand::seq::index::sample(rng, n, psi).into_vec();
                    IsolationTree::build(data, &mut sample, max_depth, rng)
                })
                .collect()
        };

        Self {
            trees,
            avg_path_length: average_path_length(psi),
        }
    }

    /// Anomaly score `2^(-E[h(x)] / c(ψ))`: close to 1 for points isolated
    /// quickly, well below 0.5 for points deep inside the population.
    pub fn score(&self, sample: &[f64]) -> f64 {
        if self.trees.is_empty() || self.avg_path_length <= 0.0 {
            return 0.5;
        }

        let total: f64 = self.trees.iter().map(|t| t.path_length(sample)).sum();
        let avg_path = total / self.trees.len() as f64;

        2.0_f64.powf(-avg_path / self.avg_path_length)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Average unsuccessful-search path length in a BST of `n` nodes, c(n).
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature_idx: usize,
        split_value: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationTree {
    fn build<R: Rng>(
        data: &FeatureMatrix,
        sample: &mut [usize],
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            root: Self::build_node(data, sample, 0, max_depth, rng),
        }
    }

    fn build_node<R: Rng>(
        data: &FeatureMatrix,
        sample: &mut [usize],
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || sample.len() <= 1 {
            return IsolationNode::Leaf { size: sample.len() };
        }

        let feature_idx = rng.gen_range(0..data.cols());

        let (min_val, max_val) = sample.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &i| {
                let v = data.row(i)[feature_idx];
                (lo.min(v), hi.max(v))
            },
        );

        // All values equal on this feature: nothing left to isolate here.
        if max_val <= min_val {
            return IsolationNode::Leaf { size: sample.len() };
        }

        let split_value = rng.gen_range(min_val..max_val);

        // In-place partition: indices left of `mid` go to the left child.
        let mut mid = 0;
        for k in 0..sample.len() {
            if data.row(sample[k])[feature_idx] < split_value {
                sample.swap(k, mid);
                mid += 1;
            }
        }

        let (left, right) = sample.split_at_mut(mid);
        IsolationNode::Internal {
            feature_idx,
            split_value,
            left: Box::new(Self::build_node(data, left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => {
                    // Unbuilt subtree below a truncated leaf.
                    return depth as f64 + average_path_length(*size);
                }
                IsolationNode::Internal {
                    feature_idx,
                    split_value,
                    left,
                    right,
                } => {
                    let v = sample.get(*feature_idx).copied().unwrap_or(0.0);
                    node = if v < *split_value { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}
