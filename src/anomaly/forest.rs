//! Isolation forest over dense numeric feature rows.
//!
//! Trees are grown on random subsamples by repeatedly splitting on a random
//! non-constant feature at a uniform random threshold. Rows that end up in
//! shallow leaves are easy to isolate and score close to 1.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::DetectionError;
use super::types::OutlierLabel;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub random_seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            random_seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), DetectionError> {
        if self.n_estimators == 0 {
            return Err(DetectionError::InvalidParameter {
                name: "n_estimators",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_samples == 0 {
            return Err(DetectionError::InvalidParameter {
                name: "max_samples",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(DetectionError::InvalidParameter {
                name: "contamination",
                reason: format!("must be in (0, 0.5], got {}", self.contamination),
            });
        }
        Ok(())
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

/// A fitted isolation forest. Fitting consumes no external state, so two fits
/// with the same data and seed produce identical forests.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Node>,
    width: usize,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit on `data` and place the decision offset so that roughly a
    /// `contamination` fraction of the training rows score above it.
    pub fn fit(data: &[Vec<f64>], params: &ForestParams) -> Result<Self, DetectionError> {
        params.validate()?;
        if data.len() < 2 {
            return Err(DetectionError::InsufficientData {
                required: 2,
                got: data.len(),
            });
        }
        let width = data[0].len();
        check_shape(data, width)?;

        let sample_size = params.max_samples.min(data.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.random_seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let indices =
                    rand::seq::index::sample(&mut rng, data.len(), sample_size).into_vec();
                grow(data, indices, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            width,
            sample_size,
            offset: 0.0,
        };
        let scores = forest.score_samples(data)?;
        forest.offset = quantile(&scores, 1.0 - params.contamination);
        Ok(forest)
    }

    /// Anomaly score per row: `2^(-E[h(x)] / c(sample_size))`.
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Result<Vec<f64>, DetectionError> {
        check_shape(data, self.width)?;
        let normalizer = average_path_length(self.sample_size);
        Ok(data
            .iter()
            .map(|row| {
                let mean_depth = self
                    .trees
                    .iter()
                    .map(|tree| path_length(tree, row, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2f64.powf(-mean_depth / normalizer)
            })
            .collect())
    }

    /// Label and score each row.
    pub fn predict(&self, data: &[Vec<f64>]) -> Result<Vec<(OutlierLabel, f64)>, DetectionError> {
        Ok(self
            .score_samples(data)?
            .into_iter()
            .map(|score| {
                let label = if score > self.offset {
                    OutlierLabel::Outlier
                } else {
                    OutlierLabel::Normal
                };
                (label, score)
            })
            .collect())
    }
}

fn check_shape(data: &[Vec<f64>], expected: usize) -> Result<(), DetectionError> {
    match data.iter().position(|row| row.len() != expected) {
        Some(row) => Err(DetectionError::FeatureShape {
            row,
            expected,
            got: data[row].len(),
        }),
        None => Ok(()),
    }
}

fn grow(
    data: &[Vec<f64>],
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

    // Only features that still vary inside this node can split it.
    let candidates: Vec<(usize, f64, f64)> = (0..data[indices[0]].len())
        .filter_map(|feature| {
            let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(data[i][feature]), hi.max(data[i][feature]))
            });
            (lo < hi).then_some((feature, lo, hi))
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
        .partition(|&i| data[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(data, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let next = if row[*feature] <= *threshold { left } else { right };
            path_length(next, row, depth + 1)
        }
    }
}

/// Expected path length of an unsuccessful search in a binary search tree of `n` nodes.
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

/// Linear-interpolation quantile, `q` in [0, 1].
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut data: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![10.0 + (i % 5) as f64, 5.0 + (i % 3) as f64 * 0.5])
            .collect();
        data.push(vec![400.0, 60.0]);
        data
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 5.0);
        assert!((quantile(&values, 0.9) - 4.6).abs() < 1e-12);
    }

    #[test]
    fn test_isolates_far_point() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &ForestParams::default()).unwrap();
        let scores = forest.score_samples(&data).unwrap();

        let (max_idx, _) = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(max_idx, data.len() - 1);

        let labels = forest.predict(&data).unwrap();
        assert_eq!(labels[data.len() - 1].0, OutlierLabel::Outlier);
    }

    #[test]
    fn test_contamination_bounds_outlier_count() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &ForestParams::default()).unwrap();
        let outliers = forest
            .predict(&data)
            .unwrap()
            .iter()
            .filter(|(label, _)| *label == OutlierLabel::Outlier)
            .count();
        // Strictly above the 90th percentile of 31 scores leaves at most 3 rows.
        assert!(outliers >= 1 && outliers <= 3, "got {outliers}");
    }

    #[test]
    fn test_same_seed_same_scores() {
        let data = cluster_with_outlier();
        let params = ForestParams::default();
        let a = IsolationForest::fit(&data, &params).unwrap().score_samples(&data).unwrap();
        let b = IsolationForest::fit(&data, &params).unwrap().score_samples(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_data_has_no_outliers() {
        let data = vec![vec![1.0, 0.0, 1.0]; 12];
        let forest = IsolationForest::fit(&data, &ForestParams::default()).unwrap();
        let labels = forest.predict(&data).unwrap();
        assert!(labels.iter().all(|(label, _)| *label == OutlierLabel::Normal));
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let params = ForestParams::default();
        assert!(matches!(
            IsolationForest::fit(&[], &params),
            Err(DetectionError::InsufficientData { got: 0, .. })
        ));
        assert!(matches!(
            IsolationForest::fit(&[vec![1.0]], &params),
            Err(DetectionError::InsufficientData { got: 1, .. })
        ));
        assert!(matches!(
            IsolationForest::fit(&[vec![1.0, 2.0], vec![1.0]], &params),
            Err(DetectionError::FeatureShape { row: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_params() {
        let data = cluster_with_outlier();
        let params = ForestParams {
            contamination: 0.0,
            ..ForestParams::default()
        };
        assert!(matches!(
            IsolationForest::fit(&data, &params),
            Err(DetectionError::InvalidParameter { name: "contamination", .. })
        ));
    }
}
