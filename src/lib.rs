//! Laying-curve forecasting for open breeding batches.
//!
//! A random-forest baseline trained on closed batches is bias-corrected per
//! batch and blended with the batch's own post-peak decline line. Forecasts
//! carry widening uncertainty bands and, where female balance is known,
//! projected egg output that rolls up to farm level.

pub mod baseline;
pub mod bias;
pub mod blend;
pub mod config;
pub mod cumulative;
pub mod decline;
pub mod engine;
pub mod error;
pub mod forest;
pub mod observations;
pub mod population;
pub mod regression;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod session;
pub mod standard;

#[cfg(feature = "python")]
mod python;

pub use baseline::BaselineModel;
pub use config::{ForecastConfig, ForestConfig, LoadOptions};
pub use engine::{BatchExclusion, BatchForecastProfile, ForecastRun};
pub use error::{ForecastError, SkipReason};
pub use observations::{BatchHistory, BatchKey, BatchStatus, Observation, ObservationTable};
pub use rollup::FarmRollup;
pub use session::ForecastSession;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Observation
    let observation = PyModule::new(m.py(), "observation")?;
    observation.add("FARM_ID", schema::observation::FARM_ID)?;
    observation.add("BATCH_ID", schema::observation::BATCH_ID)?;
    observation.add("STATUS", schema::observation::STATUS)?;
    observation.add("WEEK", schema::observation::WEEK)?;
    observation.add("PERCENTAGE", schema::observation::PERCENTAGE)?;
    observation.add(
        "STANDARD_PERCENTAGE",
        schema::observation::STANDARD_PERCENTAGE,
    )?;
    observation.add("POPULATION", schema::observation::POPULATION)?;
    observation.add("CUMULATIVE_OUTPUT", schema::observation::CUMULATIVE_OUTPUT)?;
    m.add_submodule(&observation)?;

    // Status
    let status = PyModule::new(m.py(), "status")?;
    status.add("CLOSED", schema::status::CLOSED)?;
    status.add("OPEN", schema::status::OPEN)?;
    m.add_submodule(&status)?;

    // Forecast
    let forecast = PyModule::new(m.py(), "forecast")?;
    forecast.add("FORECAST", schema::forecast::FORECAST)?;
    forecast.add("LOWER", schema::forecast::LOWER)?;
    forecast.add("UPPER", schema::forecast::UPPER)?;
    forecast.add("R2", schema::forecast::R2)?;
    forecast.add("RMSE", schema::forecast::RMSE)?;
    forecast.add(
        "PROJECTED_POPULATION",
        schema::forecast::PROJECTED_POPULATION,
    )?;
    forecast.add("INCREMENT", schema::forecast::INCREMENT)?;
    forecast.add(
        "CUMULATIVE_PROJECTION",
        schema::forecast::CUMULATIVE_PROJECTION,
    )?;
    m.add_submodule(&forecast)?;

    // Exclusion
    let exclusion = PyModule::new(m.py(), "exclusion")?;
    exclusion.add("SCOPE", schema::exclusion::SCOPE)?;
    exclusion.add("REASON", schema::exclusion::REASON)?;
    exclusion.add("DETAIL", schema::exclusion::DETAIL)?;
    m.add_submodule(&exclusion)?;

    // Scope
    let scope = PyModule::new(m.py(), "scope")?;
    scope.add("BATCH", schema::scope::BATCH)?;
    scope.add("VOLUME", schema::scope::VOLUME)?;
    scope.add("FARM_POPULATION", schema::scope::FARM_POPULATION)?;
    m.add_submodule(&scope)?;

    // Population trend
    let population = PyModule::new(m.py(), "population")?;
    population.add("OBSERVED_POPULATION", schema::population::OBSERVED_POPULATION)?;
    m.add_submodule(&population)?;

    // Standard curve
    let standard = PyModule::new(m.py(), "standard")?;
    standard.add("STANDARD_MEAN", schema::standard::STANDARD_MEAN)?;
    m.add_submodule(&standard)?;

    // Rollup
    let rollup = PyModule::new(m.py(), "rollup")?;
    rollup.add(
        "OBSERVED_MEAN_PERCENTAGE",
        schema::rollup::OBSERVED_MEAN_PERCENTAGE,
    )?;
    rollup.add(
        "OBSERVED_TOTAL_POPULATION",
        schema::rollup::OBSERVED_TOTAL_POPULATION,
    )?;
    rollup.add(
        "OBSERVED_TOTAL_CUMULATIVE",
        schema::rollup::OBSERVED_TOTAL_CUMULATIVE,
    )?;
    rollup.add("BATCH_COUNT", schema::rollup::BATCH_COUNT)?;
    m.add_submodule(&rollup)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
#[pyo3(name = "_core")]
fn core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyForecaster>()?;
    m.add_function(wrap_pyfunction!(python::init_logging, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
