//! Farm-level aggregation of batch histories and forecasts.
//!
//! Output volume is rolled up by summing per-batch weekly increments and
//! integrating once, starting from the sum of the batches' own starting
//! totals. Batches forecast from different weeks therefore contribute
//! exactly their own increments, never a re-compounded running total.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ForecastConfig;
use crate::cumulative::CumulativeProjection;
use crate::engine::BatchForecastProfile;
use crate::error::SkipReason;
use crate::observations::{BatchHistory, BatchKey};
use crate::population::PopulationTrend;

/// Observed farm totals for one week.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedWeek {
    pub week: u32,
    pub mean_percentage: f64,
    pub total_population: Option<f64>,
    pub total_cumulative: Option<f64>,
}

/// Forecast farm totals for one week.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupWeek {
    pub week: u32,
    /// Number of batches forecasting this week.
    pub batch_count: usize,
    pub mean_forecast: f64,
    pub mean_lower: f64,
    pub mean_upper: f64,
    /// Farm-level population trend at this week.
    pub projected_population: Option<f64>,
    /// Sum of batch increments; undefined if any contributing batch's is.
    pub increment: Option<f64>,
    pub cumulative: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FarmRollup {
    pub farm_id: String,
    /// Open batches with enough history to take part in the rollup.
    pub batches: Vec<BatchKey>,
    pub observed: Vec<ObservedWeek>,
    /// Trend of the summed observed population.
    pub population: Result<PopulationTrend, SkipReason>,
    /// Starting total: sum of the volume-projected batches' own seeds.
    pub seed: f64,
    pub weeks: Vec<RollupWeek>,
}

#[derive(Default)]
struct ObservedAcc {
    percentages: Vec<f64>,
    population: Option<f64>,
    cumulative: Option<f64>,
}

#[derive(Default)]
struct ForecastAcc {
    forecasts: Vec<f64>,
    lowers: Vec<f64>,
    uppers: Vec<f64>,
    increment: Option<f64>,
    undefined_increment: bool,
}

impl ForecastAcc {
    fn increment(&self) -> Option<f64> {
        if self.undefined_increment {
            None
        } else {
            self.increment
        }
    }
}

fn add_defined(total: &mut Option<f64>, value: Option<f64>) {
    if let Some(v) = value {
        *total = Some(total.unwrap_or(0.0) + v);
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Aggregate one farm.
///
/// `histories` are the farm's open batches; only those with at least
/// `min_observed_weeks` distinct weeks take part. `profiles` are the farm's
/// forecast profiles from a single run.
pub fn farm_rollup(
    farm_id: &str,
    histories: &[&BatchHistory],
    profiles: &[&BatchForecastProfile],
    config: &ForecastConfig,
) -> FarmRollup {
    let eligible: Vec<&BatchHistory> = histories
        .iter()
        .copied()
        .filter(|h| h.key.farm_id == farm_id && h.observed_weeks() >= config.min_observed_weeks)
        .collect();

    // ── Observed aggregate ──────────────────────────────────────────────────
    let mut observed_acc: BTreeMap<u32, ObservedAcc> = BTreeMap::new();
    for history in &eligible {
        for o in &history.observations {
            let acc = observed_acc.entry(o.week).or_default();
            acc.percentages.push(o.percentage);
            add_defined(&mut acc.population, o.population);
            add_defined(&mut acc.cumulative, o.cumulative_output);
        }
    }
    let observed: Vec<ObservedWeek> = observed_acc
        .into_iter()
        .map(|(week, acc)| ObservedWeek {
            week,
            mean_percentage: mean(&acc.percentages),
            total_population: acc.population,
            total_cumulative: acc.cumulative,
        })
        .collect();

    let population_points: Vec<(f64, f64)> = observed
        .iter()
        .filter_map(|o| o.total_population.map(|p| (o.week as f64, p)))
        .collect();
    let population = PopulationTrend::project(
        &population_points,
        config.min_population_points,
        config.horizon_end,
    );

    // ── Forecast aggregate ──────────────────────────────────────────────────
    let profiles: Vec<&BatchForecastProfile> = profiles
        .iter()
        .copied()
        .filter(|p| eligible.iter().any(|h| h.key == p.key))
        .collect();

    let mut forecast_acc: BTreeMap<u32, ForecastAcc> = BTreeMap::new();
    let mut seed = 0.0;
    for profile in &profiles {
        let volume = profile.volume.as_ref().ok();
        if let Some(v) = volume {
            seed += v.cumulative.seed;
        }
        for point in &profile.points {
            let acc = forecast_acc.entry(point.week).or_default();
            acc.forecasts.push(point.forecast);
            acc.lowers.push(point.lower);
            acc.uppers.push(point.upper);

            if volume.is_some() {
                match profile.increment(point.week) {
                    Some(v) => add_defined(&mut acc.increment, Some(v)),
                    None => acc.undefined_increment = true,
                }
            }
        }
    }

    let increments: Vec<(u32, Option<f64>)> = forecast_acc
        .iter()
        .map(|(&week, acc)| (week, acc.increment()))
        .collect();
    let cumulative = CumulativeProjection::integrate(Some(seed), increments);
    let projected_total = cumulative.final_total();

    let weeks: Vec<RollupWeek> = forecast_acc
        .into_iter()
        .zip(cumulative.points)
        .map(|((week, acc), point)| RollupWeek {
            week,
            batch_count: acc.forecasts.len(),
            mean_forecast: mean(&acc.forecasts),
            mean_lower: mean(&acc.lowers),
            mean_upper: mean(&acc.uppers),
            projected_population: population.as_ref().ok().and_then(|t| t.at(week)),
            increment: point.increment,
            cumulative: point.cumulative,
        })
        .collect();

    debug!(
        farm = farm_id,
        batches = eligible.len(),
        forecast_batches = profiles.len(),
        weeks = weeks.len(),
        projected_total,
        "rolled up farm"
    );
    if let Err(reason) = &population {
        debug!(farm = farm_id, %reason, "no farm population trend");
    }

    FarmRollup {
        farm_id: farm_id.to_string(),
        batches: eligible.iter().map(|h| h.key.clone()).collect(),
        observed,
        population,
        seed,
        weeks,
    }
}
