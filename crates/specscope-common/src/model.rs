//! Binary interference classifier.
//!
//! [`Classifier`] is the seam the prediction facade depends on; any model
//! that can produce a label and a positive-class probability fits. The
//! bundled implementation is a bagged ensemble of CART decision trees
//! ([`RandomForest`]) persisted as a JSON artifact.
//!
//! Trees are stored as flat parallel arrays: node `i` is a leaf when
//! `feature[i] < 0`; otherwise samples with `x[feature[i]] <= threshold[i]`
//! go to `left[i]`, the rest to `right[i]`.

use std::path::Path;

use rand::RngExt as _;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecscopeError};
use crate::models::{FEATURE_NAMES, FeatureVector, N_FEATURES};

/// A pre-trained binary classifier.
pub trait Classifier: Send + Sync {
    /// Probability that the reading is interference, in `[0, 1]`.
    fn predict_proba(&self, features: &FeatureVector) -> f64;

    /// Hard label.
    fn predict_label(&self, features: &FeatureVector) -> bool {
        self.predict_proba(features) > 0.5
    }
}

const LEAF: i32 = -1;

/// One fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    feature: Vec<i32>,
    threshold: Vec<f64>,
    left: Vec<i32>,
    right: Vec<i32>,
    /// Fraction of positive training samples reaching the node.
    value: Vec<f64>,
}

impl DecisionTree {
    fn empty() -> Self {
        Self {
            feature: Vec::new(),
            threshold: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
            value: Vec::new(),
        }
    }

    /// Check that every child index points inside the tree and that
    /// children come after their parent (so traversal terminates).
    fn validate(&self) -> std::result::Result<(), String> {
        let n = self.feature.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if [self.threshold.len(), self.left.len(), self.right.len(), self.value.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err("tree arrays have mismatched lengths".into());
        }
        for i in 0..n {
            if self.feature[i] == LEAF {
                continue;
            }
            if self.feature[i] < 0 || self.feature[i] as usize >= N_FEATURES {
                return Err(format!("node {i} splits on unknown feature {}", self.feature[i]));
            }
            for child in [self.left[i], self.right[i]] {
                if child as i64 <= i as i64 || child as usize >= n {
                    return Err(format!("node {i} has invalid child {child}"));
                }
            }
        }
        Ok(())
    }

    pub fn predict_proba(&self, x: &[f64; N_FEATURES]) -> f64 {
        let mut node = 0usize;
        while self.feature[node] != LEAF {
            let f = self.feature[node] as usize;
            node = if x[f] <= self.threshold[node] {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        self.value[node]
    }

    fn push_leaf(&mut self, value: f64) -> usize {
        self.feature.push(LEAF);
        self.threshold.push(0.0);
        self.left.push(LEAF);
        self.right.push(LEAF);
        self.value.push(value);
        self.feature.len() - 1
    }
}

/// Hyperparameters for [`RandomForest::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 32,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Bagged ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub version: u32,
    pub feature_names: Vec<String>,
    pub params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on `x` with binary targets `y`.
    pub fn fit(x: &[[f64; N_FEATURES]], y: &[bool], params: ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(SpecscopeError::EmptyDataset);
        }
        if x.len() != y.len() {
            return Err(SpecscopeError::Model(format!(
                "{} samples but {} labels",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(SpecscopeError::Model("n_estimators must be positive".into()));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let trees = (0..params.n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                TreeBuilder {
                    x,
                    y,
                    params: &params,
                    rng: &mut rng,
                    tree: DecisionTree::empty(),
                }
                .build(sample)
            })
            .collect();

        tracing::debug!(
            samples = n,
            trees = params.n_estimators,
            "fitted random forest"
        );

        Ok(Self {
            version: MODEL_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            params,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree positive fractions.
    pub fn predict_proba_array(&self, x: &[f64; N_FEATURES]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_proba(x)).sum();
        total / self.trees.len() as f64
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        std::fs::write(path, json).map_err(|e| SpecscopeError::io(path, e))?;
        tracing::info!(path = %path.display(), trees = self.trees.len(), "model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SpecscopeError::MissingFile(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|e| SpecscopeError::io(path, e))?;
        let model: RandomForest = serde_json::from_slice(&bytes)?;
        model.validate()?;
        tracing::info!(path = %path.display(), trees = model.trees.len(), "model loaded");
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(SpecscopeError::Model(format!(
                "unsupported model version {}",
                self.version
            )));
        }
        if self.feature_names != FEATURE_NAMES {
            return Err(SpecscopeError::Model(format!(
                "model expects features {:?}, this build provides {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.trees.is_empty() {
            return Err(SpecscopeError::Model("model has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| SpecscopeError::Model(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        self.predict_proba_array(&features.to_array())
    }
}

// ── Tree construction ───────────────────────────────────────────────

struct TreeBuilder<'a> {
    x: &'a [[f64; N_FEATURES]],
    y: &'a [bool],
    params: &'a ForestParams,
    rng: &'a mut StdRng,
    tree: DecisionTree,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Number of features examined at each split.
fn max_features() -> usize {
    ((N_FEATURES as f64).sqrt() as usize).max(1)
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

impl TreeBuilder<'_> {
    fn build(mut self, sample: Vec<usize>) -> DecisionTree {
        self.grow(sample, 0);
        self.tree
    }

    /// Grow the subtree for `sample` and return its root index.
    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let positives = sample.iter().filter(|&&i| self.y[i]).count();
        let value = positives as f64 / sample.len() as f64;

        let pure = positives == 0 || positives == sample.len();
        if pure || depth >= self.params.max_depth || sample.len() < self.params.min_samples_split {
            return self.tree.push_leaf(value);
        }

        let Some(split) = self.best_split(&sample, positives) else {
            return self.tree.push_leaf(value);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let node = self.tree.push_leaf(value);
        self.tree.feature[node] = split.feature as i32;
        self.tree.threshold[node] = split.threshold;
        let l = self.grow(left, depth + 1);
        let r = self.grow(right, depth + 1);
        self.tree.left[node] = l as i32;
        self.tree.right[node] = r as i32;
        node
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        // Partial Fisher-Yates: the first `k` slots become a random subset.
        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        let k = max_features();
        for i in 0..k {
            let j = self.rng.random_range(i..N_FEATURES);
            features.swap(i, j);
        }
        features.truncate(k);
        features
    }

    fn best_split(&mut self, sample: &[usize], positives: usize) -> Option<Split> {
        let mut best: Option<Split> = None;
        let mut candidates = self.candidate_features();
        // Fall back to the remaining features when the drawn ones are all
        // constant in this node.
        let rest: Vec<usize> = (0..N_FEATURES).filter(|f| !candidates.contains(f)).collect();
        candidates.extend(rest);

        for (rank, &feature) in candidates.iter().enumerate() {
            if rank >= max_features() && best.is_some() {
                break;
            }
            if let Some(split) = self.best_split_on(sample, positives, feature) {
                if best.as_ref().is_none_or(|b| split.impurity < b.impurity) {
                    best = Some(split);
                }
            }
        }
        best
    }

    fn best_split_on(&self, sample: &[usize], positives: usize, feature: usize) -> Option<Split> {
        let mut order: Vec<usize> = sample.to_vec();
        order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

        let n = order.len();
        let mut left_pos = 0usize;
        let mut best: Option<Split> = None;
        for k in 1..n {
            if self.y[order[k - 1]] {
                left_pos += 1;
            }
            let lo = self.x[order[k - 1]][feature];
            let hi = self.x[order[k]][feature];
            if lo == hi {
                continue;
            }
            let right_pos = positives - left_pos;
            let impurity = (k as f64 * gini(left_pos, k)
                + (n - k) as f64 * gini(right_pos, n - k))
                / n as f64;
            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                let mut threshold = lo + (hi - lo) / 2.0;
                // Guard against the midpoint rounding up to `hi`.
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Separable toy data: interference iff power > 30.
    fn toy_data() -> (Vec<[f64; N_FEATURES]>, Vec<bool>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..200 {
            let power = -60.0 + i as f64 * 0.6;
            let frequency = 300.0 + (i * 37 % 2500) as f64;
            x.push([frequency, power, 37.0, -122.0, (i % 24) as f64]);
            y.push(power > 30.0);
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        }
    }

    fn vector(power: f64) -> FeatureVector {
        FeatureVector {
            frequency: 1000.0,
            power,
            latitude: 37.0,
            longitude: -122.0,
            hour: 12,
        }
    }

    #[test]
    fn learns_a_power_threshold() {
        let (x, y) = toy_data();
        let model = RandomForest::fit(&x, &y, small_params()).unwrap();
        assert_eq!(model.n_trees(), 15);
        assert!(model.predict_label(&vector(55.0)));
        assert!(!model.predict_label(&vector(-40.0)));
        let p = model.predict_proba(&vector(55.0));
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn fitting_is_deterministic_for_a_seed() {
        let (x, y) = toy_data();
        let a = RandomForest::fit(&x, &y, small_params()).unwrap();
        let b = RandomForest::fit(&x, &y, small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_class_data_predicts_that_class() {
        let (x, _) = toy_data();
        let y = vec![false; x.len()];
        let model = RandomForest::fit(&x, &y, small_params()).unwrap();
        assert_eq!(model.predict_proba(&vector(55.0)), 0.0);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            RandomForest::fit(&[], &[], ForestParams::default()),
            Err(SpecscopeError::EmptyDataset)
        ));
        let (x, y) = toy_data();
        assert!(RandomForest::fit(&x, &y[..10], ForestParams::default()).is_err());
        let params = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        assert!(RandomForest::fit(&x, &y, params).is_err());
    }

    #[test]
    fn save_and_load() {
        let (x, y) = toy_data();
        let model = RandomForest::fit(&x, &y, small_params()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rf_model.json");
        model.save(&path).unwrap();
        let loaded = RandomForest::load(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn load_rejects_corrupt_trees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let bad = serde_json::json!({
            "version": MODEL_FORMAT_VERSION,
            "feature_names": FEATURE_NAMES,
            "params": ForestParams::default(),
            "trees": [{
                "feature": [1],
                "threshold": [0.0],
                "left": [0],
                "right": [0],
                "value": [0.5]
            }]
        });
        std::fs::write(&path, serde_json::to_vec(&bad).unwrap()).unwrap();
        assert!(matches!(
            RandomForest::load(&path),
            Err(SpecscopeError::Model(_))
        ));
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            RandomForest::load(Path::new("/nonexistent/rf_model.json")),
            Err(SpecscopeError::MissingFile(_))
        ));
    }
}
