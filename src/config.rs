use std::collections::HashMap;

use crate::error::ForecastError;
use crate::schema::status;

/// Last productive week the engine forecasts or projects.
pub const HORIZON_END: u32 = 45;

// ── Engine configuration ────────────────────────────────────────────────────

/// Tunable constants of the forecasting engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Weight of the bias-corrected baseline in the blend; the decline trend gets the rest.
    pub ml_weight: f64,
    /// Uncertainty multiplier at the first forecast week.
    pub scale_start: f64,
    /// Uncertainty multiplier at the last forecast week.
    pub scale_end: f64,
    /// Number of trailing observations used to measure volatility.
    pub volatility_window: usize,
    /// Minimum distinct observed weeks before an open batch is forecast.
    pub min_observed_weeks: usize,
    /// Weeks after the peak excluded from the decline segment.
    pub decline_guard_weeks: u32,
    pub min_decline_points: usize,
    pub min_population_points: usize,
    pub horizon_end: u32,
    pub days_per_week: f64,
    pub forest: ForestConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            ml_weight: 0.4,
            scale_start: 1.5,
            scale_end: 2.5,
            volatility_window: 5,
            min_observed_weeks: 10,
            decline_guard_weeks: 2,
            min_decline_points: 2,
            min_population_points: 5,
            horizon_end: HORIZON_END,
            days_per_week: 7.0,
            forest: ForestConfig::default(),
        }
    }
}

impl ForecastConfig {
    pub fn trend_weight(&self) -> f64 {
        1.0 - self.ml_weight
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        if !(0.0..=1.0).contains(&self.ml_weight) {
            return Err(ForecastError::InvalidConfig(format!(
                "ml_weight must be within [0, 1], got {}",
                self.ml_weight
            )));
        }
        if self.scale_start < 0.0 || self.scale_end < 0.0 {
            return Err(ForecastError::InvalidConfig(
                "uncertainty scale range must be non-negative".to_string(),
            ));
        }
        if self.volatility_window == 0 {
            return Err(ForecastError::InvalidConfig(
                "volatility_window must be at least 1".to_string(),
            ));
        }
        if self.min_decline_points < 2 {
            return Err(ForecastError::InvalidConfig(
                "min_decline_points must be at least 2 to fit a line".to_string(),
            ));
        }
        if self.min_population_points < 2 {
            return Err(ForecastError::InvalidConfig(
                "min_population_points must be at least 2 to fit a line".to_string(),
            ));
        }
        if self.horizon_end == 0 || self.horizon_end > HORIZON_END {
            return Err(ForecastError::InvalidConfig(format!(
                "horizon_end must be within 1..={HORIZON_END}, got {}",
                self.horizon_end
            )));
        }
        if self.days_per_week <= 0.0 {
            return Err(ForecastError::InvalidConfig(
                "days_per_week must be positive".to_string(),
            ));
        }
        self.forest.validate()
    }
}

/// Random forest parameters for the baseline model.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    /// `None` grows every tree until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Load options ────────────────────────────────────────────────────────────

/// How a source table is mapped onto the observation schema.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Source column name → schema column name, applied before validation.
    pub rename: HashMap<String, String>,
    /// Status label of completed batches (compared trimmed, case-insensitive).
    pub closed_label: String,
    pub open_label: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            rename: HashMap::new(),
            closed_label: status::CLOSED.to_string(),
            open_label: status::OPEN.to_string(),
        }
    }
}
