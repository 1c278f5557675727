//! Tabular outputs for rendering and reporting collaborators.
//!
//! Undefined per-week values become nulls; nothing is zero-filled.

use polars::prelude::*;

use crate::engine::ForecastRun;
use crate::error::{ForecastError, SkipReason};
use crate::observations::BatchKey;
use crate::rollup::FarmRollup;
use crate::schema::{exclusion, forecast, observation, population, rollup, scope};

fn column<T, P: ?Sized>(name: &str, values: T) -> Column
where
    Series: NamedFrom<T, P>,
{
    Column::new(name.into(), values)
}

impl ForecastRun {
    /// One row per forecast week per batch.
    pub fn to_frame(&self) -> Result<DataFrame, ForecastError> {
        let rows: usize = self.profiles.iter().map(|p| p.points.len()).sum();
        let mut farms = Vec::with_capacity(rows);
        let mut batches = Vec::with_capacity(rows);
        let mut weeks = Vec::with_capacity(rows);
        let mut forecasts = Vec::with_capacity(rows);
        let mut lowers = Vec::with_capacity(rows);
        let mut uppers = Vec::with_capacity(rows);
        let mut r2s = Vec::with_capacity(rows);
        let mut rmses = Vec::with_capacity(rows);
        let mut populations: Vec<Option<f64>> = Vec::with_capacity(rows);
        let mut increments: Vec<Option<f64>> = Vec::with_capacity(rows);
        let mut cumulatives: Vec<Option<f64>> = Vec::with_capacity(rows);

        for profile in &self.profiles {
            let volume = profile.volume.as_ref().ok();
            for point in &profile.points {
                farms.push(profile.key.farm_id.clone());
                batches.push(profile.key.batch_id.clone());
                weeks.push(point.week as i64);
                forecasts.push(point.forecast);
                lowers.push(point.lower);
                uppers.push(point.upper);
                r2s.push(profile.decline.r_squared());
                rmses.push(profile.decline.rmse());

                let projected = volume.and_then(|v| v.cumulative.at(point.week));
                populations.push(volume.and_then(|v| v.trend.at(point.week)));
                increments.push(projected.and_then(|p| p.increment));
                cumulatives.push(projected.and_then(|p| p.cumulative));
            }
        }

        Ok(DataFrame::new(vec![
            column(observation::FARM_ID, farms),
            column(observation::BATCH_ID, batches),
            column(observation::WEEK, weeks),
            column(forecast::FORECAST, forecasts),
            column(forecast::LOWER, lowers),
            column(forecast::UPPER, uppers),
            column(forecast::R2, r2s),
            column(forecast::RMSE, rmses),
            column(forecast::PROJECTED_POPULATION, populations),
            column(forecast::INCREMENT, increments),
            column(forecast::CUMULATIVE_PROJECTION, cumulatives),
        ])?)
    }

    /// Every skipped computation of the run: excluded batches (scope
    /// `batch`) followed by forecast batches without a volume projection
    /// (scope `volume`).
    pub fn exclusions_frame(&self) -> Result<DataFrame, ForecastError> {
        let skips: Vec<(&BatchKey, &str, &SkipReason)> = self
            .exclusions
            .iter()
            .map(|e| (&e.key, scope::BATCH, &e.reason))
            .chain(
                self.volume_skips()
                    .map(|(key, reason)| (key, scope::VOLUME, reason)),
            )
            .collect();

        let farms: Vec<&str> = skips.iter().map(|(k, _, _)| k.farm_id.as_str()).collect();
        let batches: Vec<Option<&str>> = skips
            .iter()
            .map(|(k, _, _)| Some(k.batch_id.as_str()))
            .collect();
        let scopes: Vec<&str> = skips.iter().map(|(_, s, _)| *s).collect();
        skip_frame(farms, batches, scopes, skips.iter().map(|(_, _, r)| *r))
    }

    /// Observed and projected population per batch over weeks 1..=horizon end.
    ///
    /// Only batches with a volume projection appear.
    pub fn population_frame(&self) -> Result<DataFrame, ForecastError> {
        let mut farms = Vec::new();
        let mut batches = Vec::new();
        let mut weeks = Vec::new();
        let mut observed: Vec<Option<f64>> = Vec::new();
        let mut projected: Vec<Option<f64>> = Vec::new();

        for profile in &self.profiles {
            let Ok(volume) = &profile.volume else {
                continue;
            };
            for (week, _) in volume.trend.series() {
                farms.push(profile.key.farm_id.clone());
                batches.push(profile.key.batch_id.clone());
                weeks.push(week as i64);
                observed.push(volume.trend.observed_at(week));
                projected.push(volume.trend.at(week));
            }
        }

        Ok(DataFrame::new(vec![
            column(observation::FARM_ID, farms),
            column(observation::BATCH_ID, batches),
            column(observation::WEEK, weeks),
            column(population::OBSERVED_POPULATION, observed),
            column(forecast::PROJECTED_POPULATION, projected),
        ])?)
    }
}

/// Skip table shared by runs and rollups: farm, batch (null for farm-level
/// skips), scope, reason code and readable detail.
fn skip_frame<'a>(
    farms: Vec<&str>,
    batches: Vec<Option<&str>>,
    scopes: Vec<&str>,
    reasons: impl Iterator<Item = &'a SkipReason>,
) -> Result<DataFrame, ForecastError> {
    let (codes, details): (Vec<&str>, Vec<String>) =
        reasons.map(|r| (r.code(), r.to_string())).unzip();

    Ok(DataFrame::new(vec![
        column(observation::FARM_ID, farms),
        column(observation::BATCH_ID, batches),
        column(exclusion::SCOPE, scopes),
        column(exclusion::REASON, codes),
        column(exclusion::DETAIL, details),
    ])?)
}

impl FarmRollup {
    /// Observed farm totals per week.
    pub fn observed_frame(&self) -> Result<DataFrame, ForecastError> {
        let weeks: Vec<i64> = self.observed.iter().map(|o| o.week as i64).collect();
        let means: Vec<f64> = self.observed.iter().map(|o| o.mean_percentage).collect();
        let populations: Vec<Option<f64>> =
            self.observed.iter().map(|o| o.total_population).collect();
        let cumulatives: Vec<Option<f64>> =
            self.observed.iter().map(|o| o.total_cumulative).collect();

        Ok(DataFrame::new(vec![
            column(observation::WEEK, weeks),
            column(rollup::OBSERVED_MEAN_PERCENTAGE, means),
            column(rollup::OBSERVED_TOTAL_POPULATION, populations),
            column(rollup::OBSERVED_TOTAL_CUMULATIVE, cumulatives),
        ])?)
    }

    /// Farm-level skips, in the same layout as [`ForecastRun::exclusions_frame`].
    pub fn exclusions_frame(&self) -> Result<DataFrame, ForecastError> {
        let reasons: Vec<&SkipReason> = self.population.as_ref().err().into_iter().collect();
        skip_frame(
            vec![self.farm_id.as_str(); reasons.len()],
            vec![None; reasons.len()],
            vec![scope::FARM_POPULATION; reasons.len()],
            reasons.into_iter(),
        )
    }

    /// Summed observed population against the farm trend, weeks 1..=horizon end.
    ///
    /// Empty when the farm has too little population history for a trend.
    pub fn population_frame(&self) -> Result<DataFrame, ForecastError> {
        let trend = self.population.as_ref().ok();
        let series: Vec<(u32, f64)> = trend.map(|t| t.series().collect()).unwrap_or_default();

        let weeks: Vec<i64> = series.iter().map(|&(w, _)| w as i64).collect();
        let observed: Vec<Option<f64>> = series
            .iter()
            .map(|&(w, _)| trend.and_then(|t| t.observed_at(w)))
            .collect();
        let projected: Vec<Option<f64>> = series
            .iter()
            .map(|&(w, _)| trend.and_then(|t| t.at(w)))
            .collect();

        Ok(DataFrame::new(vec![
            column(observation::WEEK, weeks),
            column(population::OBSERVED_POPULATION, observed),
            column(forecast::PROJECTED_POPULATION, projected),
        ])?)
    }

    /// Forecast farm totals per week.
    pub fn to_frame(&self) -> Result<DataFrame, ForecastError> {
        let w = &self.weeks;
        Ok(DataFrame::new(vec![
            column(
                observation::WEEK,
                w.iter().map(|r| r.week as i64).collect::<Vec<_>>(),
            ),
            column(
                rollup::BATCH_COUNT,
                w.iter().map(|r| r.batch_count as u32).collect::<Vec<_>>(),
            ),
            column(
                forecast::FORECAST,
                w.iter().map(|r| r.mean_forecast).collect::<Vec<_>>(),
            ),
            column(
                forecast::LOWER,
                w.iter().map(|r| r.mean_lower).collect::<Vec<_>>(),
            ),
            column(
                forecast::UPPER,
                w.iter().map(|r| r.mean_upper).collect::<Vec<_>>(),
            ),
            column(
                forecast::PROJECTED_POPULATION,
                w.iter().map(|r| r.projected_population).collect::<Vec<_>>(),
            ),
            column(
                forecast::INCREMENT,
                w.iter().map(|r| r.increment).collect::<Vec<_>>(),
            ),
            column(
                forecast::CUMULATIVE_PROJECTION,
                w.iter().map(|r| r.cumulative).collect::<Vec<_>>(),
            ),
        ])?)
    }
}
