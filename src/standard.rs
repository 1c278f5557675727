use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::ForecastError;
use crate::observations::BatchHistory;
use crate::schema::{observation, standard};

/// Reference curve: mean standard percentage per week over every batch.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardCurve {
    /// Mean for week `i + 1` at index `i`; `None` for weeks with no standard.
    means: Vec<Option<f64>>,
}

impl StandardCurve {
    /// Average every defined standard percentage per week onto the
    /// 1..=horizon_end grid, closed and open batches alike.
    pub fn from_histories(histories: &[BatchHistory], horizon_end: u32) -> Self {
        let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for o in histories.iter().flat_map(|h| &h.observations) {
            if let Some(value) = o.standard_percentage {
                let entry = sums.entry(o.week).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        let means = (1..=horizon_end)
            .map(|week| sums.get(&week).map(|&(sum, n)| sum / n as f64))
            .collect();
        Self { means }
    }

    pub fn at(&self, week: u32) -> Option<f64> {
        let index = (week as usize).checked_sub(1)?;
        self.means.get(index).copied().flatten()
    }

    /// (week, mean) for every week of the grid.
    pub fn series(&self) -> impl Iterator<Item = (u32, Option<f64>)> + '_ {
        self.means
            .iter()
            .enumerate()
            .map(|(i, &m)| (i as u32 + 1, m))
    }

    pub fn to_frame(&self) -> Result<DataFrame, ForecastError> {
        let (weeks, means): (Vec<i64>, Vec<Option<f64>>) =
            self.series().map(|(w, m)| (w as i64, m)).unzip();
        Ok(DataFrame::new(vec![
            Column::new(observation::WEEK.into(), weeks),
            Column::new(standard::STANDARD_MEAN.into(), means),
        ])?)
    }
}
