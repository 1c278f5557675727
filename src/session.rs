use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::baseline::BaselineModel;
use crate::config::{ForecastConfig, LoadOptions};
use crate::engine::{forecast_batch, BatchExclusion, BatchForecastProfile, ForecastRun};
use crate::error::{ForecastError, SkipReason};
use crate::observations::{BatchHistory, BatchKey, ObservationTable};
use crate::rollup::{farm_rollup, FarmRollup};
use crate::standard::StandardCurve;

/// Forecasting context: the loaded observations and the baseline trained on them.
///
/// Loading new observations drops the trained baseline; runs computed
/// against an earlier training are rejected by [`ForecastSession::farm_rollup`].
#[derive(Debug)]
pub struct ForecastSession {
    config: ForecastConfig,
    observations: Option<ObservationTable>,
    model: Option<BaselineModel>,
}

impl ForecastSession {
    pub fn new(config: ForecastConfig) -> Result<Self, ForecastError> {
        config.validate()?;
        Ok(Self {
            config,
            observations: None,
            model: None,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    // ── Data loading ────────────────────────────────────────────────────────

    pub fn load(&mut self, table: ObservationTable) {
        if self.model.take().is_some() {
            info!("observations replaced; baseline model invalidated");
        }
        self.observations = Some(table);
    }

    pub fn load_csv(
        &mut self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<&ObservationTable, ForecastError> {
        let table = ObservationTable::from_csv(path, options)?;
        self.load(table);
        self.observations()
    }

    pub fn load_frame(
        &mut self,
        frame: DataFrame,
        options: &LoadOptions,
    ) -> Result<&ObservationTable, ForecastError> {
        let table = ObservationTable::from_frame(frame, options)?;
        self.load(table);
        self.observations()
    }

    pub fn observations(&self) -> Result<&ObservationTable, ForecastError> {
        self.observations
            .as_ref()
            .ok_or_else(|| ForecastError::NotLoaded("observations".into()))
    }

    // ── Training ────────────────────────────────────────────────────────────

    /// Train the baseline on every closed batch, replacing any previous model.
    pub fn train(&mut self) -> Result<&BaselineModel, ForecastError> {
        let points = self.observations()?.closed_points();
        let model = BaselineModel::train(&points, &self.config.forest)?;
        Ok(self.model.insert(model))
    }

    pub fn model(&self) -> Result<&BaselineModel, ForecastError> {
        self.model.as_ref().ok_or(ForecastError::NotTrained)
    }

    // ── Forecasting ─────────────────────────────────────────────────────────

    /// Forecast every open batch. Skipped batches are listed in the run's exclusions.
    pub fn forecast(&self) -> Result<ForecastRun, ForecastError> {
        let model = self.model()?;
        let observations = self.observations()?;

        let mut profiles = Vec::new();
        let mut exclusions = Vec::new();
        for history in observations.open_batches() {
            match forecast_batch(model, history, &self.config) {
                Ok(profile) => profiles.push(profile),
                Err(reason) => {
                    warn!(batch = %history.key, %reason, "batch excluded from forecast");
                    exclusions.push(BatchExclusion {
                        key: history.key.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            generation = %model.generation(),
            forecast = profiles.len(),
            excluded = exclusions.len(),
            "forecast run complete"
        );
        Ok(ForecastRun {
            generation: model.generation(),
            profiles,
            exclusions,
        })
    }

    /// Forecast a single open batch.
    pub fn forecast_batch(
        &self,
        key: &BatchKey,
    ) -> Result<Result<BatchForecastProfile, SkipReason>, ForecastError> {
        let model = self.model()?;
        let history = self
            .observations()?
            .open_batch(key)
            .ok_or_else(|| ForecastError::NotLoaded(format!("open batch {key}")))?;
        Ok(forecast_batch(model, history, &self.config))
    }

    // ── Aggregates ──────────────────────────────────────────────────────────

    pub fn standard_curve(&self) -> Result<StandardCurve, ForecastError> {
        Ok(StandardCurve::from_histories(
            self.observations()?.batches(),
            self.config.horizon_end,
        ))
    }

    /// Roll up one farm from a run produced by the current baseline.
    ///
    /// The farm must have at least one open batch in the loaded observations.
    pub fn farm_rollup(&self, run: &ForecastRun, farm_id: &str) -> Result<FarmRollup, ForecastError> {
        let current = self.model()?.generation();
        if run.generation != current {
            return Err(ForecastError::StaleRun {
                run: run.generation,
                current,
            });
        }

        let observations = self.observations()?;
        if !observations.open_farms().iter().any(|f| f == farm_id) {
            return Err(ForecastError::UnknownFarm(farm_id.to_string()));
        }

        let histories: Vec<&BatchHistory> = observations
            .open_batches()
            .filter(|h| h.key.farm_id == farm_id)
            .collect();
        let profiles: Vec<&BatchForecastProfile> = run.farm_profiles(farm_id).collect();
        Ok(farm_rollup(farm_id, &histories, &profiles, &self.config))
    }
}
