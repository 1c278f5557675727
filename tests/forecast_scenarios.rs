mod common;

use common::*;
use lay_forecast::schema::{exclusion, forecast, observation, population, scope};
use lay_forecast::{BatchKey, ForecastConfig, ForecastError, ForecastSession, LoadOptions, SkipReason};

fn fleet() -> Vec<Row> {
    let mut rows = Vec::new();
    rows.extend(closed_batch("F1", "A"));
    rows.extend(closed_batch("F1", "B"));
    rows.extend(open_batch(
        "F1",
        "C",
        &peaked_curve(20, 15, 91.0, 1.0),
        |w| Some(1000.0 - w as f64),
    ));
    rows
}

#[test]
fn forecast_blends_bias_corrected_baseline_with_decline_line() {
    let session = trained_session(&fleet());
    let run = session.forecast().unwrap();
    let model = session.model().unwrap();

    let key = BatchKey::new("F1", "C");
    let profile = run.profile(&key).unwrap();
    assert_eq!(profile.decline.peak_week, 15);
    assert_eq!(profile.decline.line.n, 3);

    let history = session.observations().unwrap().open_batch(&key).unwrap();
    let bias = history
        .observations
        .iter()
        .map(|o| o.percentage - model.predict(o.week))
        .sum::<f64>()
        / history.observations.len() as f64;
    assert!((profile.bias - bias).abs() < 1e-9);

    let p = profile.point(21).unwrap();
    let ml = model.predict(21) + bias;
    let trend = 85.0;
    assert!((p.ml_component - ml).abs() < 1e-9);
    assert!((p.trend_component - trend).abs() < 1e-9);
    assert!((p.forecast - (0.4 * ml + 0.6 * trend)).abs() < 1e-9);
    assert!(p.forecast >= ml.min(trend) && p.forecast <= ml.max(trend));
}

#[test]
fn forecast_horizon_runs_to_week_45() {
    let session = trained_session(&fleet());
    let run = session.forecast().unwrap();
    let profile = run.profile(&BatchKey::new("F1", "C")).unwrap();

    let weeks: Vec<u32> = profile.weeks().collect();
    assert_eq!(weeks, (21..=45).collect::<Vec<_>>());
}

#[test]
fn ineligible_batches_are_excluded_with_reasons() {
    let mut rows = fleet();
    rows.extend(open_batch("F1", "SHORT", &peaked_curve(9, 5, 80.0, 1.0), |_| None));
    // Peak in the last week: nothing after the guard.
    rows.extend(open_batch("F2", "RISING", &peaked_curve(12, 12, 80.0, 1.0), |_| None));
    let session = trained_session(&rows);
    let run = session.forecast().unwrap();

    assert_eq!(
        run.exclusion(&BatchKey::new("F1", "SHORT")),
        Some(&SkipReason::InsufficientHistory {
            observed: 9,
            required: 10
        })
    );
    assert!(matches!(
        run.exclusion(&BatchKey::new("F2", "RISING")),
        Some(SkipReason::InsufficientDecline { peak_week: 12, points: 0, .. })
    ));
    assert!(run.profile(&BatchKey::new("F1", "SHORT")).is_none());
    assert_eq!(run.farms(), vec!["F1".to_string()]);

    let table = run.to_frame().unwrap();
    assert_eq!(table.height(), 25);
    let batches = table.column("batch_id").unwrap().str().unwrap();
    assert!(batches.into_iter().all(|b| b == Some("C")));

    let excluded = run.exclusions_frame().unwrap();
    assert_eq!(excluded.height(), 2);
    let scopes = excluded.column(exclusion::SCOPE).unwrap().str().unwrap();
    assert!(scopes.into_iter().all(|s| s == Some(scope::BATCH)));
}

#[test]
fn forecast_table_carries_fit_quality_and_volume() {
    let session = trained_session(&fleet());
    let run = session.forecast().unwrap();
    let table = run.to_frame().unwrap();

    for name in [
        forecast::FORECAST,
        forecast::LOWER,
        forecast::UPPER,
        forecast::R2,
        forecast::RMSE,
        forecast::PROJECTED_POPULATION,
        forecast::INCREMENT,
        forecast::CUMULATIVE_PROJECTION,
    ] {
        assert!(table.column(name).is_ok(), "missing column {name}");
    }

    let r2 = table.column(forecast::R2).unwrap().f64().unwrap();
    assert!(r2.into_iter().all(|v| (v.unwrap() - 1.0).abs() < 1e-9));
    assert_eq!(table.column(forecast::CUMULATIVE_PROJECTION).unwrap().null_count(), 0);
}

#[test]
fn retraining_is_deterministic() {
    let a = trained_session(&fleet());
    let b = trained_session(&fleet());
    let (ma, mb) = (a.model().unwrap(), b.model().unwrap());

    for week in 1..=45 {
        assert_eq!(ma.predict(week), mb.predict(week));
    }
    assert_ne!(ma.generation(), mb.generation());
}

#[test]
fn no_closed_batches_means_no_baseline() {
    let rows = open_batch("F1", "C", &peaked_curve(20, 15, 91.0, 1.0), |_| None);
    let mut session = ForecastSession::new(ForecastConfig::default()).unwrap();
    session.load_frame(frame(&rows), &LoadOptions::default()).unwrap();

    assert!(matches!(session.train(), Err(ForecastError::UntrainableBaseline)));
    assert!(matches!(session.forecast(), Err(ForecastError::NotTrained)));
}

#[test]
fn runs_from_an_older_training_are_rejected() {
    let mut session = trained_session(&fleet());
    let run = session.forecast().unwrap();
    assert!(session.farm_rollup(&run, "F1").is_ok());

    session.train().unwrap();
    assert!(matches!(
        session.farm_rollup(&run, "F1"),
        Err(ForecastError::StaleRun { .. })
    ));

    session
        .load_frame(frame(&fleet()), &LoadOptions::default())
        .unwrap();
    assert!(matches!(session.model(), Err(ForecastError::NotTrained)));
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = ForecastConfig {
        ml_weight: 1.5,
        ..ForecastConfig::default()
    };
    assert!(matches!(
        ForecastSession::new(config),
        Err(ForecastError::InvalidConfig(_))
    ));
}

#[test]
fn blend_weights_are_configurable() {
    let config = ForecastConfig {
        ml_weight: 1.0,
        ..ForecastConfig::default()
    };
    let mut session = ForecastSession::new(config).unwrap();
    session
        .load_frame(frame(&fleet()), &LoadOptions::default())
        .unwrap();
    session.train().unwrap();

    let run = session.forecast().unwrap();
    let profile = run.profile(&BatchKey::new("F1", "C")).unwrap();
    for p in &profile.points {
        assert!((p.forecast - p.ml_component).abs() < 1e-9);
    }
}

#[test]
fn standard_curve_averages_all_batches_per_week() {
    let session = trained_session(&fleet());
    let curve = session.standard_curve().unwrap();

    assert!((curve.at(1).unwrap() - 1.0).abs() < 1e-9);
    assert!((curve.at(30).unwrap() - 91.0).abs() < 1e-9);
    assert!((curve.at(45).unwrap() - 51.0).abs() < 1e-9);
    assert_eq!(curve.series().count(), 45);
    assert_eq!(curve.to_frame().unwrap().height(), 45);
}

#[test]
fn skipped_volume_projection_is_reported_with_its_scope() {
    let mut rows = fleet();
    rows.extend(open_batch("F1", "NOPOP", &peaked_curve(20, 15, 91.0, 1.0), |_| None));
    let session = trained_session(&rows);
    let run = session.forecast().unwrap();

    let key = BatchKey::new("F1", "NOPOP");
    let profile = run.profile(&key).unwrap();
    assert!(matches!(
        profile.volume,
        Err(SkipReason::InsufficientPopulation { points: 0, required: 5 })
    ));
    assert_eq!(run.volume_skips().count(), 1);

    let excluded = run.exclusions_frame().unwrap();
    assert_eq!(excluded.height(), 1);
    let batch = excluded.column(observation::BATCH_ID).unwrap().str().unwrap();
    let scopes = excluded.column(exclusion::SCOPE).unwrap().str().unwrap();
    let reasons = excluded.column(exclusion::REASON).unwrap().str().unwrap();
    assert_eq!(batch.get(0), Some("NOPOP"));
    assert_eq!(scopes.get(0), Some(scope::VOLUME));
    assert_eq!(reasons.get(0), Some("insufficient_population"));
}

#[test]
fn population_trend_table_covers_every_week() {
    let session = trained_session(&fleet());
    let run = session.forecast().unwrap();
    let table = run.population_frame().unwrap();

    // one batch with a volume projection, weeks 1..=45
    assert_eq!(table.height(), 45);
    let weeks = table.column(observation::WEEK).unwrap().i64().unwrap();
    assert_eq!(weeks.get(0), Some(1));
    assert_eq!(weeks.get(44), Some(45));

    let observed = table.column(population::OBSERVED_POPULATION).unwrap().f64().unwrap();
    let projected = table.column(forecast::PROJECTED_POPULATION).unwrap().f64().unwrap();
    // observed for weeks 1..=20 only; the line is exact on 1000 - week
    assert_eq!(observed.null_count(), 25);
    assert_eq!(observed.get(9), Some(990.0));
    assert!((projected.get(9).unwrap() - 990.0).abs() < 1e-6);
    assert!((projected.get(44).unwrap() - 955.0).abs() < 1e-6);
}

#[test]
fn rollup_of_farm_without_open_batches_is_rejected() {
    let session = trained_session(&fleet());
    let run = session.forecast().unwrap();
    assert!(matches!(
        session.farm_rollup(&run, "NOWHERE"),
        Err(ForecastError::UnknownFarm(farm)) if farm == "NOWHERE"
    ));
}
