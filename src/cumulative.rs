/// Projected output of one forecast week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumulativePoint {
    pub week: u32,
    /// Output produced during the week; `None` when its inputs are undefined.
    pub increment: Option<f64>,
    /// Running total at the end of the week; `None` when the increment is undefined.
    pub cumulative: Option<f64>,
}

/// Cumulative output chained forward from the last known real total.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeProjection {
    /// Total the chain starts from.
    pub seed: f64,
    pub points: Vec<CumulativePoint>,
}

impl CumulativeProjection {
    /// Chain `increments` (in week order) onto `seed`.
    ///
    /// A missing seed starts from zero. An undefined increment leaves its
    /// week undefined and the next week chains from the last defined total.
    pub fn integrate(
        seed: Option<f64>,
        increments: impl IntoIterator<Item = (u32, Option<f64>)>,
    ) -> Self {
        let seed = seed.filter(|s| s.is_finite()).unwrap_or(0.0);
        let mut running = seed;
        let points = increments
            .into_iter()
            .map(|(week, increment)| {
                let cumulative = increment.map(|inc| {
                    running += inc;
                    running
                });
                CumulativePoint {
                    week,
                    increment,
                    cumulative,
                }
            })
            .collect();
        Self { seed, points }
    }

    pub fn at(&self, week: u32) -> Option<&CumulativePoint> {
        self.points.iter().find(|p| p.week == week)
    }

    /// Last defined running total, or the seed when nothing was added.
    pub fn final_total(&self) -> f64 {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.cumulative)
            .unwrap_or(self.seed)
    }
}

/// Output for one week: daily laying rate × population × days.
pub fn weekly_increment(
    percentage: Option<f64>,
    population: Option<f64>,
    days_per_week: f64,
) -> Option<f64> {
    let pct = percentage.filter(|v| v.is_finite())?;
    let pop = population.filter(|v| v.is_finite())?;
    Some(pct / 100.0 * pop * days_per_week)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_formula() {
        assert_eq!(weekly_increment(Some(50.0), Some(1000.0), 7.0), Some(3500.0));
        assert_eq!(weekly_increment(None, Some(1000.0), 7.0), None);
        assert_eq!(weekly_increment(Some(50.0), Some(f64::NAN), 7.0), None);
    }

    #[test]
    fn chains_from_seed() {
        let proj =
            CumulativeProjection::integrate(Some(100.0), [(21, Some(10.0)), (22, Some(5.0))]);
        assert_eq!(proj.points[0].cumulative, Some(110.0));
        assert_eq!(proj.points[1].cumulative, Some(115.0));
        assert_eq!(proj.final_total(), 115.0);
    }

    #[test]
    fn undefined_week_is_skipped_not_zeroed() {
        let proj = CumulativeProjection::integrate(
            Some(100.0),
            [(21, Some(10.0)), (22, None), (23, Some(1.0))],
        );
        let week22 = proj.at(22).unwrap();
        assert_eq!(week22.increment, None);
        assert_eq!(week22.cumulative, None);
        assert_eq!(proj.at(23).unwrap().cumulative, Some(111.0));
    }

    #[test]
    fn missing_seed_starts_at_zero() {
        let proj = CumulativeProjection::integrate(None, [(1, Some(7.0))]);
        assert_eq!(proj.seed, 0.0);
        assert_eq!(proj.final_total(), 7.0);

        let empty = CumulativeProjection::integrate(Some(42.0), std::iter::empty());
        assert_eq!(empty.final_total(), 42.0);
    }
}
