//! Post-peak decline of a laying curve.
//!
//! The decline segment starts strictly after `peak_week + guard`; the weeks
//! right after the peak are a noisy plateau and are left out of the fit.

use crate::error::SkipReason;
use crate::observations::Observation;
use crate::regression::LinearFit;

/// Linear trend fitted over the decline segment of one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclineFit {
    /// First week holding the maximum observed percentage.
    pub peak_week: u32,
    pub line: LinearFit,
}

impl DeclineFit {
    pub fn predict(&self, week: u32) -> f64 {
        self.line.predict(week as f64)
    }

    /// Weekly change of the laying percentage (negative while declining).
    pub fn slope(&self) -> f64 {
        self.line.slope
    }

    pub fn r_squared(&self) -> f64 {
        self.line.r_squared
    }

    pub fn rmse(&self) -> f64 {
        self.line.rmse
    }
}

/// First week, in week order, with the maximum percentage.
pub fn peak_week(observations: &[Observation]) -> Option<u32> {
    let mut peak: Option<&Observation> = None;
    for o in observations {
        match peak {
            Some(p) if o.percentage < p.percentage => {}
            Some(p) if o.percentage == p.percentage && o.week >= p.week => {}
            _ => peak = Some(o),
        }
    }
    peak.map(|p| p.week)
}

/// Fit the decline segment of `observations`.
pub fn fit_decline(
    observations: &[Observation],
    guard_weeks: u32,
    min_points: usize,
) -> Result<DeclineFit, SkipReason> {
    let peak = peak_week(observations).unwrap_or(0);
    let cutoff = peak + guard_weeks;

    let segment: Vec<(f64, f64)> = observations
        .iter()
        .filter(|o| o.week > cutoff)
        .map(|o| (o.week as f64, o.percentage))
        .collect();

    let insufficient = || SkipReason::InsufficientDecline {
        peak_week: peak,
        points: segment.len(),
        required: min_points,
    };
    if segment.len() < min_points {
        return Err(insufficient());
    }
    // Repeated weeks only can't carry a slope.
    let line = LinearFit::fit(&segment).ok_or_else(insufficient)?;

    Ok(DeclineFit {
        peak_week: peak,
        line,
    })
}
