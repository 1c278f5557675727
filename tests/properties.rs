//! Property-based tests for forecast bands, eligibility and cumulative output.

use lay_forecast::blend::scale_ramp;
use lay_forecast::config::ForestConfig;
use lay_forecast::cumulative::{weekly_increment, CumulativeProjection};
use lay_forecast::engine::forecast_batch;
use lay_forecast::regression::LinearFit;
use lay_forecast::{BaselineModel, BatchHistory, BatchKey, BatchStatus, ForecastConfig, Observation};
use proptest::prelude::*;

fn baseline() -> BaselineModel {
    let points: Vec<(f64, f64)> = (1..=45)
        .map(|w| {
            let w = w as f64;
            (w, if w <= 20.0 { 4.5 * w } else { 90.0 - 1.5 * (w - 20.0) })
        })
        .collect();
    let config = ForestConfig {
        n_estimators: 10,
        ..ForestConfig::default()
    };
    BaselineModel::train(&points, &config).unwrap()
}

fn history(percentages: &[f64], population: f64) -> BatchHistory {
    let observations = percentages
        .iter()
        .enumerate()
        .map(|(i, &p)| Observation {
            week: i as u32 + 1,
            percentage: p,
            population: Some(population - i as f64),
            cumulative_output: None,
            standard_percentage: None,
        })
        .collect();
    BatchHistory::new(BatchKey::new("F", "B"), BatchStatus::Open, observations)
}

fn curve_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..100.0, 1..45)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Bands always enclose the point forecast.
    #[test]
    fn bounds_enclose_forecast(curve in curve_strategy()) {
        let model = baseline();
        if let Ok(profile) = forecast_batch(&model, &history(&curve, 5000.0), &ForecastConfig::default()) {
            for p in &profile.points {
                prop_assert!(p.lower <= p.forecast, "week {}: {} > {}", p.week, p.lower, p.forecast);
                prop_assert!(p.forecast <= p.upper, "week {}: {} > {}", p.week, p.forecast, p.upper);
                prop_assert!(p.week > curve.len() as u32 && p.week <= 45);
            }
        }
    }

    /// Short histories never produce a forecast.
    #[test]
    fn short_histories_are_never_forecast(curve in prop::collection::vec(0.0f64..100.0, 1..10)) {
        let model = baseline();
        prop_assert!(forecast_batch(&model, &history(&curve, 5000.0), &ForecastConfig::default()).is_err());
    }

    /// Non-negative increments keep the running total non-decreasing.
    #[test]
    fn cumulative_is_monotone(
        seed in prop::option::of(0.0f64..1e6),
        inputs in prop::collection::vec((0.0f64..100.0, 0.0f64..10_000.0), 1..45),
    ) {
        let increments = inputs
            .iter()
            .enumerate()
            .map(|(i, &(pct, pop))| (i as u32 + 1, weekly_increment(Some(pct), Some(pop), 7.0)));
        let projection = CumulativeProjection::integrate(seed, increments);

        let mut previous = projection.seed;
        for point in &projection.points {
            let current = point.cumulative.unwrap();
            prop_assert!(current >= previous);
            previous = current;
        }
    }

    /// Any two distinct points give an exact line.
    #[test]
    fn two_points_fit_perfectly(x1 in 1u32..45, gap in 1u32..10, y1 in 0.0f64..100.0, y2 in 0.0f64..100.0) {
        let fit = LinearFit::fit(&[(x1 as f64, y1), ((x1 + gap) as f64, y2)]).unwrap();
        prop_assert!((fit.r_squared - 1.0).abs() < 1e-9);
        prop_assert!(fit.rmse < 1e-6);
    }

    /// The uncertainty multiplier ramps monotonically across the horizon.
    #[test]
    fn scale_ramp_is_monotone(len in 1usize..45) {
        let ramp = scale_ramp(len, 1.5, 2.5);
        prop_assert_eq!(ramp.len(), len);
        prop_assert!((ramp[0] - 1.5).abs() < 1e-12);
        if len > 1 {
            prop_assert!((ramp[len - 1] - 2.5).abs() < 1e-12);
        }
        prop_assert!(ramp.windows(2).all(|w| w[0] <= w[1]));
    }
}
