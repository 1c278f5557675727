//! Ordinary least squares on (x, y) pairs.
//!
//! Used for both the decline segment of a laying curve and the female
//! balance trend. Fit quality (R², RMSE) is computed over the fitted points.

/// A fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination over the fitted points.
    pub r_squared: f64,
    /// Root-mean-square error over the fitted points.
    pub rmse: f64,
    pub n: usize,
}

impl LinearFit {
    /// Fit a line through `points`. Returns `None` with fewer than two
    /// points or when every x is identical.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        if sxx.abs() < 1e-12 {
            return None;
        }
        let sxy: f64 = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let ss_res: f64 = points
            .iter()
            .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
            .sum();
        let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();

        // A flat segment is perfectly explained only when the residuals vanish too.
        let r_squared = if ss_tot > 1e-12 {
            1.0 - ss_res / ss_tot
        } else if ss_res <= 1e-12 {
            1.0
        } else {
            0.0
        };

        Some(Self {
            slope,
            intercept,
            r_squared,
            rmse: (ss_res / n).sqrt(),
            n: points.len(),
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Population standard deviation (divides by n). Empty input has no spread.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
