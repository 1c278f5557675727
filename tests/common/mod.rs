#![allow(dead_code)]

use lay_forecast::schema::observation;
use lay_forecast::{ForecastConfig, ForecastSession, LoadOptions};
use polars::prelude::*;

/// One source row.
#[derive(Debug, Clone)]
pub struct Row {
    pub farm: &'static str,
    pub batch: &'static str,
    pub status: &'static str,
    pub week: i64,
    pub percentage: f64,
    pub standard: Option<f64>,
    pub population: Option<f64>,
    pub cumulative: Option<f64>,
}

/// Reference laying curve: linear rise 0→90 over weeks 1..=30, then down to 50 at 45.
pub fn reference_curve(week: u32) -> f64 {
    let w = week as f64;
    if w <= 30.0 {
        90.0 * (w - 1.0) / 29.0
    } else {
        90.0 - 40.0 * (w - 30.0) / 15.0
    }
}

pub fn closed_batch(farm: &'static str, batch: &'static str) -> Vec<Row> {
    (1..=45)
        .map(|w| Row {
            farm,
            batch,
            status: "Closed",
            week: w as i64,
            percentage: reference_curve(w),
            standard: Some(reference_curve(w) + 1.0),
            population: Some(5000.0 - 10.0 * w as f64),
            cumulative: None,
        })
        .collect()
}

/// Open batch with the given percentages for weeks 1..=len.
pub fn open_batch(
    farm: &'static str,
    batch: &'static str,
    percentages: &[f64],
    population: impl Fn(u32) -> Option<f64>,
) -> Vec<Row> {
    let mut cumulative = 0.0;
    percentages
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let week = i as u32 + 1;
            let pop = population(week);
            if let Some(pop) = pop {
                cumulative += p / 100.0 * pop * 7.0;
            }
            Row {
                farm,
                batch,
                status: "Open",
                week: week as i64,
                percentage: p,
                standard: None,
                population: pop,
                cumulative: pop.map(|_| cumulative),
            }
        })
        .collect()
}

pub fn frame(rows: &[Row]) -> DataFrame {
    df!(
        observation::FARM_ID => rows.iter().map(|r| r.farm).collect::<Vec<_>>(),
        observation::BATCH_ID => rows.iter().map(|r| r.batch).collect::<Vec<_>>(),
        observation::STATUS => rows.iter().map(|r| r.status).collect::<Vec<_>>(),
        observation::WEEK => rows.iter().map(|r| r.week).collect::<Vec<_>>(),
        observation::PERCENTAGE => rows.iter().map(|r| r.percentage).collect::<Vec<_>>(),
        observation::STANDARD_PERCENTAGE => rows.iter().map(|r| r.standard).collect::<Vec<_>>(),
        observation::POPULATION => rows.iter().map(|r| r.population).collect::<Vec<_>>(),
        observation::CUMULATIVE_OUTPUT => rows.iter().map(|r| r.cumulative).collect::<Vec<_>>(),
    )
    .unwrap()
}

pub fn trained_session(rows: &[Row]) -> ForecastSession {
    let mut session = ForecastSession::new(ForecastConfig::default()).unwrap();
    session
        .load_frame(frame(rows), &LoadOptions::default())
        .unwrap();
    session.train().unwrap();
    session
}

/// Open-batch curve peaking at `peak` in `peak_week`, declining `slope` per week after.
pub fn peaked_curve(len: usize, peak_week: usize, peak: f64, slope: f64) -> Vec<f64> {
    (1..=len)
        .map(|w| {
            if w <= peak_week {
                peak * w as f64 / peak_week as f64
            } else {
                peak - slope * (w - peak_week) as f64
            }
        })
        .collect()
}
