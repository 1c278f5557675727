use crate::baseline::BaselineModel;
use crate::observations::Observation;

/// Mean residual of a batch against the baseline over its observed weeks.
///
/// Corrects the systematic offset of a batch (genetic line, housing) from
/// the population curve without retraining. No history means no offset.
pub fn calibrate_bias(model: &BaselineModel, observations: &[Observation]) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }
    let total: f64 = observations
        .iter()
        .map(|o| o.percentage - model.predict(o.week))
        .sum();
    total / observations.len() as f64
}
