//! Gradient-boosted decision trees for binary classification.
//!
//! Logistic loss with second-order (Newton) leaf weights and L2 leaf
//! regularisation. Positive rows are reweighted by `scale_pos_weight`.

use crate::error::{EngineError, Result};

/// Boosting hyperparameters
#[derive(Debug, Clone)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// Weight applied to positive-class rows
    pub scale_pos_weight: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 4,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
            scale_pos_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: &[f64]) -> f64 {
        match self {
            Node::Leaf(w) => *w,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x.get(*feature).copied().unwrap_or(0.0) < *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }
}

/// A fitted boosted-tree classifier
#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    trees: Vec<Node>,
    base_margin: f64,
}

impl GradientBoostedClassifier {
    /// Fit on labelled rows.
    ///
    /// Both classes must be present; a single-class corpus cannot produce a
    /// meaningful decision boundary.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R], labels: &[bool], params: &BoostingParams) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(EngineError::EmptyCorpus);
        }
        let attack = labels.iter().filter(|&&y| y).count();
        let normal = labels.len() - attack;
        if attack == 0 || normal == 0 {
            return Err(EngineError::DegenerateCorpus { normal, attack });
        }

        let weights: Vec<f64> = labels
            .iter()
            .map(|&y| if y { params.scale_pos_weight } else { 1.0 })
            .collect();
        let mut margins = vec![0.0; rows.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut grad = vec![0.0; rows.len()];
        let mut hess = vec![0.0; rows.len()];

        for _ in 0..params.n_estimators {
            for i in 0..rows.len() {
                let p = sigmoid(margins[i]);
                let y = if labels[i] { 1.0 } else { 0.0 };
                grad[i] = weights[i] * (p - y);
                hess[i] = (weights[i] * p * (1.0 - p)).max(1e-16);
            }

            let builder = TreeBuilder {
                rows,
                grad: &grad,
                hess: &hess,
                params,
            };
            let tree = builder.build((0..rows.len()).collect(), 0);

            for (i, row) in rows.iter().enumerate() {
                margins[i] += tree.predict(row.as_ref());
            }
            trees.push(tree);
        }

        Ok(Self {
            trees,
            base_margin: 0.0,
        })
    }

    /// Raw additive margin (log-odds)
    pub fn margin(&self, x: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.margin(x))
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}

struct TreeBuilder<'a, R> {
    rows: &'a [R],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoostingParams,
}

impl<'a, R: AsRef<[f64]>> TreeBuilder<'a, R> {
    fn build(&self, indices: Vec<usize>, depth: usize) -> Node {
        let g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let leaf = || Node::Leaf(-g / (h + self.params.lambda) * self.params.learning_rate);

        if depth >= self.params.max_depth || h < 2.0 * self.params.min_child_weight {
            return leaf();
        }

        match self.best_split(&indices, g, h) {
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| self.value(i, feature) < threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(left, depth + 1)),
                    right: Box::new(self.build(right, depth + 1)),
                }
            }
            None => leaf(),
        }
    }

    fn value(&self, row: usize, feature: usize) -> f64 {
        self.rows[row].as_ref()[feature]
    }

    /// Exact greedy search; returns the split with the largest positive gain.
    fn best_split(&self, indices: &[usize], g: f64, h: f64) -> Option<(usize, f64)> {
        let lambda = self.params.lambda;
        let mcw = self.params.min_child_weight;
        let parent = g * g / (h + lambda);
        let n_features = self.rows[indices[0]].as_ref().len();

        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 1e-12;
        let mut sorted = indices.to_vec();

        for feature in 0..n_features {
            sorted.sort_by(|&a, &b| self.value(a, feature).total_cmp(&self.value(b, feature)));

            let (mut gl, mut hl) = (0.0, 0.0);
            for pair in sorted.windows(2) {
                let (cur, next) = (pair[0], pair[1]);
                gl += self.grad[cur];
                hl += self.hess[cur];

                let (v, v_next) = (self.value(cur, feature), self.value(next, feature));
                if v_next <= v {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < mcw || hr < mcw {
                    continue;
                }

                let gain = gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, v / 2.0 + v_next / 2.0));
                }
            }
        }

        best
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<[f64; 2]>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..100 {
            let x = i as f64;
            rows.push([x, (i % 7) as f64]);
            labels.push(x >= 80.0);
        }
        (rows, labels)
    }

    #[test]
    fn test_learns_threshold() {
        let (rows, labels) = separable();
        let params = BoostingParams {
            scale_pos_weight: 4.0,
            ..Default::default()
        };
        let model = GradientBoostedClassifier::fit(&rows, &labels, &params).unwrap();

        assert_eq!(model.n_estimators(), 100);
        assert!(model.predict_proba(&[95.0, 3.0]) > 0.9);
        assert!(model.predict_proba(&[10.0, 3.0]) < 0.1);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (rows, labels) = separable();
        let model =
            GradientBoostedClassifier::fit(&rows, &labels, &BoostingParams::default()).unwrap();
        for row in &rows {
            let p = model.predict_proba(row);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let rows = vec![[1.0, 2.0], [3.0, 4.0]];
        let labels = vec![false, false];
        let err = GradientBoostedClassifier::fit(&rows, &labels, &BoostingParams::default())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::DegenerateCorpus {
                normal: 2,
                attack: 0
            }
        ));
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
