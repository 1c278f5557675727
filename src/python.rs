use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3_polars::PyDataFrame;

use crate::config::{ForecastConfig, ForestConfig, LoadOptions};
use crate::engine::ForecastRun;
use crate::error::ForecastError;
use crate::session::ForecastSession;

/// Python-facing forecasting session.
///
/// Typical use:
///     f = Forecaster("data/")
///     f.load_observations("production.csv", rename={...})
///     f.train()
///     table = f.forecast()
#[pyclass(name = "Forecaster")]
pub struct PyForecaster {
    base_path: PathBuf,
    session: ForecastSession,
    last_run: Option<ForecastRun>,
}

#[pymethods]
impl PyForecaster {
    #[new]
    #[pyo3(signature = (
        base_path = ".",
        ml_weight = 0.4,
        scale_start = 1.5,
        scale_end = 2.5,
        volatility_window = 5,
        min_observed_weeks = 10,
        decline_guard_weeks = 2,
        min_decline_points = 2,
        min_population_points = 5,
        horizon_end = 45,
        n_estimators = 100,
        seed = 42,
        max_depth = None,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        base_path: &str,
        ml_weight: f64,
        scale_start: f64,
        scale_end: f64,
        volatility_window: usize,
        min_observed_weeks: usize,
        decline_guard_weeks: u32,
        min_decline_points: usize,
        min_population_points: usize,
        horizon_end: u32,
        n_estimators: usize,
        seed: u64,
        max_depth: Option<usize>,
    ) -> PyResult<Self> {
        let config = ForecastConfig {
            ml_weight,
            scale_start,
            scale_end,
            volatility_window,
            min_observed_weeks,
            decline_guard_weeks,
            min_decline_points,
            min_population_points,
            horizon_end,
            forest: ForestConfig {
                n_estimators,
                seed,
                max_depth,
                ..ForestConfig::default()
            },
            ..ForecastConfig::default()
        };
        Ok(Self {
            base_path: PathBuf::from(base_path),
            session: ForecastSession::new(config)?,
            last_run: None,
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load observations from a CSV file relative to `base_path`.
    ///
    /// Required columns (after `rename`): farm_id, batch_id, status, week,
    /// percentage, standard_percentage, population, cumulative_output.
    /// Returns the cleaned observation table.
    #[pyo3(signature = (filename, rename=None, closed_label=None, open_label=None))]
    fn load_observations(
        &mut self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
        closed_label: Option<String>,
        open_label: Option<String>,
    ) -> PyResult<PyDataFrame> {
        let options = load_options(rename, closed_label, open_label);
        let path = self.base_path.join(filename);
        let table = self.session.load_csv(path, &options)?;
        let frame = table.frame().clone();
        self.last_run = None;
        Ok(PyDataFrame(frame))
    }

    /// Load observations from an in-memory DataFrame.
    #[pyo3(signature = (df, rename=None, closed_label=None, open_label=None))]
    fn load_dataframe(
        &mut self,
        df: PyDataFrame,
        rename: Option<HashMap<String, String>>,
        closed_label: Option<String>,
        open_label: Option<String>,
    ) -> PyResult<PyDataFrame> {
        let options = load_options(rename, closed_label, open_label);
        let table = self.session.load_frame(df.0, &options)?;
        let frame = table.frame().clone();
        self.last_run = None;
        Ok(PyDataFrame(frame))
    }

    // ── Training & forecasting ──────────────────────────────────────────────

    /// Train the baseline on closed batches. Returns the training generation id.
    fn train(&mut self) -> PyResult<String> {
        let generation = self.session.train()?.generation();
        self.last_run = None;
        Ok(generation.to_string())
    }

    /// Forecast every open batch; one row per batch and forecast week.
    fn forecast(&mut self) -> PyResult<PyDataFrame> {
        let run = self.session.forecast()?;
        let df = run.to_frame()?;
        self.last_run = Some(run);
        Ok(PyDataFrame(df))
    }

    /// Computations skipped by the last `forecast()` call: whole batches
    /// (scope "batch") and volume projections (scope "volume").
    fn exclusions(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.run()?.exclusions_frame()?))
    }

    /// Farms with at least one forecast batch in the last run.
    fn farms(&self) -> PyResult<Vec<String>> {
        Ok(self.run()?.farms())
    }

    /// Batch ids of `farm_id` forecast in the last run.
    fn batches(&self, farm_id: &str) -> PyResult<Vec<String>> {
        Ok(self
            .run()?
            .farm_profiles(farm_id)
            .map(|p| p.key.batch_id.clone())
            .collect())
    }

    /// Observed and projected population per forecast batch, weeks 1..=horizon_end.
    fn population_trend(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.run()?.population_frame()?))
    }

    /// Farm rollup of the last run as a dict of tables: "forecast",
    /// "observed", "population" and "exclusions".
    fn farm_rollup<'py>(&self, py: Python<'py>, farm_id: &str) -> PyResult<Bound<'py, PyDict>> {
        let rollup = self.session.farm_rollup(self.run()?, farm_id)?;
        let tables = PyDict::new(py);
        tables.set_item("forecast", PyDataFrame(rollup.to_frame()?))?;
        tables.set_item("observed", PyDataFrame(rollup.observed_frame()?))?;
        tables.set_item("population", PyDataFrame(rollup.population_frame()?))?;
        tables.set_item("exclusions", PyDataFrame(rollup.exclusions_frame()?))?;
        Ok(tables)
    }

    /// Mean standard percentage per week over weeks 1..=horizon_end.
    fn standard_curve(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.session.standard_curve()?.to_frame()?))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn observations_df(&self) -> Option<PyDataFrame> {
        self.session
            .observations()
            .ok()
            .map(|t| PyDataFrame(t.frame().clone()))
    }

    #[getter]
    fn generation(&self) -> Option<String> {
        self.session.model().ok().map(|m| m.generation().to_string())
    }

    #[getter]
    fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.session.model().ok().map(|m| m.trained_at())
    }
}

impl PyForecaster {
    fn run(&self) -> Result<&ForecastRun, ForecastError> {
        self.last_run
            .as_ref()
            .ok_or_else(|| ForecastError::NotLoaded("forecast run; call forecast() first".into()))
    }
}

fn load_options(
    rename: Option<HashMap<String, String>>,
    closed_label: Option<String>,
    open_label: Option<String>,
) -> LoadOptions {
    let defaults = LoadOptions::default();
    LoadOptions {
        rename: rename.unwrap_or_default(),
        closed_label: closed_label.unwrap_or(defaults.closed_label),
        open_label: open_label.unwrap_or(defaults.open_label),
    }
}

/// Install a fmt subscriber filtered by `filter` (e.g. "info", "lay_forecast=debug").
#[pyfunction]
#[pyo3(signature = (filter = "info"))]
pub fn init_logging(filter: &str) -> PyResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|e| PyValueError::new_err(format!("invalid log filter: {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| PyValueError::new_err(format!("logging already initialised: {e}")))
}
