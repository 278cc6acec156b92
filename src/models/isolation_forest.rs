//! Isolation forest outlier model.
//!
//! Scores follow the usual decision-function convention: positive for
//! inliers, negative for outliers, with zero at the contamination quantile of
//! the training data.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest hyperparameters
#[derive(Debug, Clone)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    /// Upper bound on rows drawn per tree
    pub max_samples: usize,
    /// Expected outlier fraction, in (0, 0.5]
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.15,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit on unlabeled rows. Returns `None` for an empty input.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R], params: &IsolationForestParams) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let sample_size = params.max_samples.clamp(1, rows.len());
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let indices = sample(&mut rng, rows.len(), sample_size).into_vec();
                build(rows, indices, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };

        let mut train_scores: Vec<f64> = rows.iter().map(|r| forest.score_sample(r.as_ref())).collect();
        forest.offset = percentile(&mut train_scores, params.contamination.clamp(0.0, 0.5) * 100.0);
        Some(forest)
    }

    /// Negated anomaly score in [-1, 0]; lower is more anomalous.
    pub fn score_sample(&self, x: &[f64]) -> f64 {
        let mean_depth = self
            .trees
            .iter()
            .map(|t| path_length(t, x, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size).max(f64::EPSILON);
        -(2f64.powf(-mean_depth / norm))
    }

    /// Shifted score: negative values are outliers.
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.score_sample(x) - self.offset
    }

    pub fn is_outlier(&self, x: &[f64]) -> bool {
        self.decision_function(x) < 0.0
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

fn build<R: AsRef<[f64]>>(
    rows: &[R],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let n_features = rows[indices[0]].as_ref().len();
    let candidates: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|f| {
            let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                let v = rows[i].as_ref()[f];
                (lo.min(v), hi.max(v))
            });
            (hi > lo && (hi - lo).is_finite()).then_some((f, lo, hi))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i].as_ref()[feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(build(rows, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, x: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let v = x.get(*feature).copied().unwrap_or(0.0);
            if v < *threshold {
                path_length(left, x, depth + 1)
            } else {
                path_length(right, x, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile, `q` in [0, 100].
fn percentile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = q / 100.0 * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rows: Vec<[f64; 2]> = (0..300)
            .map(|_| [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
            .collect();
        rows.push([25.0, -30.0]);
        rows
    }

    #[test]
    fn test_outlier_scores_lower_than_inliers() {
        let rows = cluster();
        let forest = IsolationForest::fit(&rows, &IsolationForestParams::default()).unwrap();

        let inlier = forest.decision_function(&[0.0, 0.0]);
        let outlier = forest.decision_function(&[25.0, -30.0]);

        assert!(outlier < inlier);
        assert!(forest.is_outlier(&[25.0, -30.0]));
        assert!(!forest.is_outlier(&[0.0, 0.0]));
    }

    #[test]
    fn test_contamination_sets_offset_quantile() {
        let rows = cluster();
        let params = IsolationForestParams {
            contamination: 0.1,
            ..Default::default()
        };
        let forest = IsolationForest::fit(&rows, &params).unwrap();

        let flagged = rows.iter().filter(|r| forest.is_outlier(&r[..])).count();
        let fraction = flagged as f64 / rows.len() as f64;
        assert!(fraction <= 0.11, "flagged fraction {fraction}");
    }

    #[test]
    fn test_scores_in_range() {
        let rows = cluster();
        let forest = IsolationForest::fit(&rows, &IsolationForestParams::default()).unwrap();
        for row in &rows {
            let s = forest.score_sample(row);
            assert!((-1.0..=0.0).contains(&s));
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let rows = cluster();
        let a = IsolationForest::fit(&rows, &IsolationForestParams::default()).unwrap();
        let b = IsolationForest::fit(&rows, &IsolationForestParams::default()).unwrap();
        assert_eq!(a.decision_function(&[0.5, 0.5]), b.decision_function(&[0.5, 0.5]));
    }

    #[test]
    fn test_extreme_values_do_not_panic() {
        let mut rows = cluster();
        rows.push([f64::MAX, 0.0]);
        rows.push([-f64::MAX, 0.0]);

        let forest = IsolationForest::fit(&rows, &IsolationForestParams::default()).unwrap();
        let s = forest.score_sample(&[f64::MAX, 0.0]);
        assert!((-1.0..=0.0).contains(&s));
    }

    #[test]
    fn test_empty_input() {
        let rows: Vec<[f64; 2]> = Vec::new();
        assert!(IsolationForest::fit(&rows, &IsolationForestParams::default()).is_none());
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > 9.0);
    }
}
