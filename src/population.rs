use crate::error::SkipReason;
use crate::regression::LinearFit;

/// Linear female-balance trajectory over weeks 1..=horizon_end.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationTrend {
    pub line: LinearFit,
    /// Points the line was fitted on, in week order.
    observed: Vec<(u32, f64)>,
    /// Projected population for week `i + 1` at index `i`.
    values: Vec<f64>,
}

impl PopulationTrend {
    /// Fit observed (week, population) pairs and project them over the full range.
    pub fn project(
        points: &[(f64, f64)],
        min_points: usize,
        horizon_end: u32,
    ) -> Result<Self, SkipReason> {
        let points: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|(_, p)| p.is_finite())
            .collect();

        let insufficient = SkipReason::InsufficientPopulation {
            points: points.len(),
            required: min_points,
        };
        if points.len() < min_points {
            return Err(insufficient);
        }
        let line = LinearFit::fit(&points).ok_or(insufficient)?;

        let values = (1..=horizon_end).map(|w| line.predict(w as f64)).collect();
        let observed = points.iter().map(|&(w, p)| (w as u32, p)).collect();
        Ok(Self {
            line,
            observed,
            values,
        })
    }

    /// Projected population at `week`; undefined outside the projected range
    /// or where the projection is not a finite number.
    pub fn at(&self, week: u32) -> Option<f64> {
        let index = (week as usize).checked_sub(1)?;
        self.values.get(index).copied().filter(|v| v.is_finite())
    }

    /// Last observed population at `week` among the fitted points.
    pub fn observed_at(&self, week: u32) -> Option<f64> {
        self.observed
            .iter()
            .rev()
            .find(|(w, _)| *w == week)
            .map(|&(_, p)| p)
    }

    /// (week, projected population) for every projected week.
    pub fn series(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as u32 + 1, v))
    }
}
