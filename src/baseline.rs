use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::ForestConfig;
use crate::error::ForecastError;
use crate::forest::RandomForest;

/// Population-level laying curve learned from closed batches.
///
/// Immutable once trained. Every training produces a new `generation`;
/// forecasts remember the generation they were computed against so that
/// artifacts from different trainings are never combined.
#[derive(Debug, Clone)]
pub struct BaselineModel {
    forest: RandomForest,
    generation: Uuid,
    trained_at: DateTime<Utc>,
    training_points: usize,
}

impl BaselineModel {
    /// Train on (week, percentage) pairs from closed batches.
    pub fn train(points: &[(f64, f64)], config: &ForestConfig) -> Result<Self, ForecastError> {
        config.validate()?;
        let forest = RandomForest::fit(points, config).ok_or(ForecastError::UntrainableBaseline)?;
        let model = Self {
            forest,
            generation: Uuid::new_v4(),
            trained_at: Utc::now(),
            training_points: points.len(),
        };
        info!(
            generation = %model.generation,
            training_points = model.training_points,
            trees = model.forest.n_trees(),
            "trained baseline model"
        );
        Ok(model)
    }

    /// Expected laying percentage at `week`.
    pub fn predict(&self, week: u32) -> f64 {
        self.forest.predict(week as f64)
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn training_points(&self) -> usize {
        self.training_points
    }
}
