use crate::baseline::BaselineModel;
use crate::config::ForecastConfig;
use crate::decline::DeclineFit;
use crate::regression::population_std_dev;

/// One forecast week of one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub week: u32,
    /// Bias-corrected baseline component.
    pub ml_component: f64,
    /// Decline-line component.
    pub trend_component: f64,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Weeks to forecast after `last_week`, up to and including `horizon_end`.
pub fn horizon(last_week: u32, horizon_end: u32) -> Vec<u32> {
    ((last_week + 1).max(1)..=horizon_end).collect()
}

/// Evenly spaced multipliers from `start` to `end`; a single step uses `start`.
pub fn scale_ramp(len: usize, start: f64, end: f64) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (len - 1) as f64;
            (0..len).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Blend baseline and decline trend over `weeks` and attach uncertainty bands.
///
/// `recent` holds the batch's latest observed percentages; their spread sets
/// the band width, which then widens linearly with forecast distance.
pub fn blend(
    model: &BaselineModel,
    bias: f64,
    decline: &DeclineFit,
    recent: &[f64],
    weeks: &[u32],
    config: &ForecastConfig,
) -> Vec<ForecastPoint> {
    let sigma = population_std_dev(recent);
    let scales = scale_ramp(weeks.len(), config.scale_start, config.scale_end);

    weeks
        .iter()
        .zip(scales)
        .map(|(&week, scale)| {
            let ml_component = model.predict(week) + bias;
            let trend_component = decline.predict(week);
            let forecast =
                config.ml_weight * ml_component + config.trend_weight() * trend_component;

            let spread = sigma * scale;
            // Floor at zero, but never above the point forecast itself.
            let lower = (forecast - spread).max(0.0).min(forecast);
            let upper = (forecast + spread).max(forecast);

            ForecastPoint {
                week,
                ml_component,
                trend_component,
                forecast,
                lower,
                upper,
            }
        })
        .collect()
}
