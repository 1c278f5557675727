//! Bootstrap-aggregated regression trees over a single numeric feature.
//!
//! Each tree is grown on a bootstrap resample of the training points with
//! squared-error splits. Samples sharing the same x are bucketed before
//! split search, so growing a tree costs O(distinct x) per node.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ForestConfig;

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Sufficient statistics of all samples sharing one x value.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    x: f64,
    count: f64,
    sum: f64,
    sum_sq: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    count: f64,
    sum: f64,
    sum_sq: f64,
}

impl Totals {
    fn of(buckets: &[Bucket]) -> Self {
        buckets.iter().fold(Self::default(), |acc, b| Self {
            count: acc.count + b.count,
            sum: acc.sum + b.sum,
            sum_sq: acc.sum_sq + b.sum_sq,
        })
    }

    fn mean(&self) -> f64 {
        self.sum / self.count
    }

    /// Sum of squared deviations from the mean.
    fn sse(&self) -> f64 {
        (self.sum_sq - self.sum * self.sum / self.count).max(0.0)
    }
}

/// A single CART regression tree stored as a flat node arena.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn grow(samples: &mut [(f64, f64)], config: &ForestConfig) -> Self {
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let buckets = bucketize(samples);
        let mut tree = Self { nodes: Vec::new() };
        tree.build(&buckets, 0, config);
        tree
    }

    fn build(&mut self, buckets: &[Bucket], depth: usize, config: &ForestConfig) -> usize {
        let index = self.nodes.len();
        let totals = Totals::of(buckets);
        self.nodes.push(Node::Leaf(totals.mean()));

        let depth_reached = config.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || buckets.len() < 2
            || totals.count < config.min_samples_split as f64
            || totals.sse() <= 1e-12
        {
            return index;
        }

        let Some(split) = best_split(buckets, config.min_samples_leaf as f64) else {
            return index;
        };
        let threshold = (buckets[split - 1].x + buckets[split].x) / 2.0;
        let left = self.build(&buckets[..split], depth + 1, config);
        let right = self.build(&buckets[split..], depth + 1, config);
        self.nodes[index] = Node::Split {
            threshold,
            left,
            right,
        };
        index
    }

    pub fn predict(&self, x: f64) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    threshold,
                    left,
                    right,
                } => index = if x <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn bucketize(sorted: &[(f64, f64)]) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    for &(x, y) in sorted {
        match buckets.last_mut() {
            Some(b) if b.x == x => {
                b.count += 1.0;
                b.sum += y;
                b.sum_sq += y * y;
            }
            _ => buckets.push(Bucket {
                x,
                count: 1.0,
                sum: y,
                sum_sq: y * y,
            }),
        }
    }
    buckets
}

/// Index of the first bucket of the right child minimising total SSE.
fn best_split(buckets: &[Bucket], min_leaf: f64) -> Option<usize> {
    let totals = Totals::of(buckets);
    let mut left = Totals::default();
    let mut best: Option<(usize, f64)> = None;

    for k in 1..buckets.len() {
        let b = buckets[k - 1];
        left.count += b.count;
        left.sum += b.sum;
        left.sum_sq += b.sum_sq;

        let right = Totals {
            count: totals.count - left.count,
            sum: totals.sum - left.sum,
            sum_sq: totals.sum_sq - left.sum_sq,
        };
        if left.count < min_leaf || right.count < min_leaf {
            continue;
        }

        let cost = left.sse() + right.sse();
        if best.map_or(true, |(_, c)| cost < c) {
            best = Some((k, cost));
        }
    }
    best.map(|(k, _)| k)
}

// ── Forest ──────────────────────────────────────────────────────────────────

/// Random forest regressor mapping one feature to a target.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Grow `config.n_estimators` trees on bootstrap resamples of `points`.
    ///
    /// Returns `None` for an empty training set. The same points and
    /// seed always produce the same forest.
    pub fn fit(points: &[(f64, f64)], config: &ForestConfig) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let n = points.len();
        let mut sample = Vec::with_capacity(n);

        let trees = (0..config.n_estimators)
            .map(|_| {
                sample.clear();
                sample.extend((0..n).map(|_| points[rng.gen_range(0..n)]));
                RegressionTree::grow(&mut sample, config)
            })
            .collect();

        Some(Self { trees })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
