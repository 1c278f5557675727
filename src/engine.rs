//! Per-batch forecasting pipeline.
//!
//! bias calibration + decline fit → blend → population trend → cumulative
//! output. Everything here only reads the trained baseline, so batches can
//! be forecast independently of each other.

use tracing::debug;
use uuid::Uuid;

use crate::baseline::BaselineModel;
use crate::bias::calibrate_bias;
use crate::blend::{blend, horizon, ForecastPoint};
use crate::config::ForecastConfig;
use crate::cumulative::{weekly_increment, CumulativeProjection};
use crate::decline::{fit_decline, DeclineFit};
use crate::error::SkipReason;
use crate::observations::{BatchHistory, BatchKey};
use crate::population::PopulationTrend;

/// Population trend and the cumulative output it implies for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProjection {
    pub trend: PopulationTrend,
    pub cumulative: CumulativeProjection,
}

/// Everything computed for one open batch in one forecast run.
#[derive(Debug, Clone)]
pub struct BatchForecastProfile {
    pub key: BatchKey,
    /// Training generation of the baseline this profile was computed against.
    pub generation: Uuid,
    pub bias: f64,
    pub decline: DeclineFit,
    pub points: Vec<ForecastPoint>,
    /// Skipped (with its reason) when the batch lacks population history.
    pub volume: Result<VolumeProjection, SkipReason>,
}

impl BatchForecastProfile {
    pub fn weeks(&self) -> impl Iterator<Item = u32> + '_ {
        self.points.iter().map(|p| p.week)
    }

    pub fn point(&self, week: u32) -> Option<&ForecastPoint> {
        self.points.iter().find(|p| p.week == week)
    }

    /// Projected output increment at `week`, when a volume projection exists.
    pub fn increment(&self, week: u32) -> Option<f64> {
        let volume = self.volume.as_ref().ok()?;
        volume.cumulative.at(week)?.increment
    }
}

/// An open batch left out of a forecast run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchExclusion {
    pub key: BatchKey,
    pub reason: SkipReason,
}

/// Result of forecasting every open batch against one baseline generation.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub generation: Uuid,
    pub profiles: Vec<BatchForecastProfile>,
    pub exclusions: Vec<BatchExclusion>,
}

impl ForecastRun {
    pub fn profile(&self, key: &BatchKey) -> Option<&BatchForecastProfile> {
        self.profiles.iter().find(|p| &p.key == key)
    }

    pub fn exclusion(&self, key: &BatchKey) -> Option<&SkipReason> {
        self.exclusions
            .iter()
            .find(|e| &e.key == key)
            .map(|e| &e.reason)
    }

    /// Forecast batches whose volume projection was skipped, with the reason.
    pub fn volume_skips(&self) -> impl Iterator<Item = (&BatchKey, &SkipReason)> + '_ {
        self.profiles
            .iter()
            .filter_map(|p| p.volume.as_ref().err().map(|reason| (&p.key, reason)))
    }

    /// Farms with at least one forecast batch, sorted.
    pub fn farms(&self) -> Vec<String> {
        let mut farms: Vec<String> = self.profiles.iter().map(|p| p.key.farm_id.clone()).collect();
        farms.sort();
        farms.dedup();
        farms
    }

    pub fn farm_profiles<'a>(
        &'a self,
        farm_id: &'a str,
    ) -> impl Iterator<Item = &'a BatchForecastProfile> + 'a {
        self.profiles.iter().filter(move |p| p.key.farm_id == farm_id)
    }
}

/// Forecast one open batch.
///
/// Batches with too little history, no usable decline segment, or no weeks
/// left before the horizon end are skipped with their reason.
pub fn forecast_batch(
    model: &BaselineModel,
    history: &BatchHistory,
    config: &ForecastConfig,
) -> Result<BatchForecastProfile, SkipReason> {
    let observed = history.observed_weeks();
    if observed < config.min_observed_weeks {
        return Err(SkipReason::InsufficientHistory {
            observed,
            required: config.min_observed_weeks,
        });
    }

    let decline = fit_decline(
        &history.observations,
        config.decline_guard_weeks,
        config.min_decline_points,
    )?;

    let last_week = history.last_week().unwrap_or(0);
    let weeks = horizon(last_week, config.horizon_end);
    if weeks.is_empty() {
        return Err(SkipReason::HorizonExhausted {
            last_week,
            horizon_end: config.horizon_end,
        });
    }

    let bias = calibrate_bias(model, &history.observations);
    let recent: Vec<f64> = history
        .observations
        .iter()
        .rev()
        .take(config.volatility_window)
        .map(|o| o.percentage)
        .collect();
    let points = blend(model, bias, &decline, &recent, &weeks, config);

    let volume = PopulationTrend::project(
        &history.population_points(),
        config.min_population_points,
        config.horizon_end,
    )
    .map(|trend| {
        let increments = points.iter().map(|p| {
            (
                p.week,
                weekly_increment(Some(p.forecast), trend.at(p.week), config.days_per_week),
            )
        });
        let cumulative =
            CumulativeProjection::integrate(history.last_known_cumulative(), increments);
        VolumeProjection { trend, cumulative }
    });

    if let Err(reason) = &volume {
        debug!(batch = %history.key, %reason, "no volume projection");
    }

    Ok(BatchForecastProfile {
        key: history.key.clone(),
        generation: model.generation(),
        bias,
        decline,
        points,
        volume,
    })
}
