//! Twice-differentiable objectives for gradient boosting.
//!
//! A boosting round needs, for every training row, the first and second
//! derivative of the loss with respect to the current prediction. Trees are
//! then fitted to those statistics (Newton boosting).

use ndarray::ArrayView1;

/// A loss function usable as a boosting objective.
///
/// Implementors must define:
/// - The constant initial prediction that minimises the loss.
/// - Per-row gradient and hessian of the loss w.r.t. the prediction.
/// - The scalar loss value (for logging).
pub trait Objective {
    /// Optimal constant prediction for `targets`.
    fn base_score(&self, targets: ArrayView1<'_, f64>) -> f64;

    /// Fill `grad` and `hess` with ∂L/∂pred and ∂²L/∂pred² for every row.
    fn gradients(
        &self,
        predictions: &[f64],
        targets: ArrayView1<'_, f64>,
        grad: &mut [f64],
        hess: &mut [f64],
    );

    /// Mean loss over all rows.
    fn loss(&self, predictions: &[f64], targets: ArrayView1<'_, f64>) -> f64;
}

/// Squared error: `L = ½ (pred − target)²`.
///
/// Gradient `pred − target`, hessian `1`. The base score is the target mean.
#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredError;

impl Objective for SquaredError {
    fn base_score(&self, targets: ArrayView1<'_, f64>) -> f64 {
        targets.mean().unwrap_or(0.0)
    }

    fn gradients(
        &self,
        predictions: &[f64],
        targets: ArrayView1<'_, f64>,
        grad: &mut [f64],
        hess: &mut [f64],
    ) {
        for (i, (&p, &y)) in predictions.iter().zip(targets.iter()).enumerate() {
            grad[i] = p - y;
            hess[i] = 1.0;
        }
    }

    fn loss(&self, predictions: &[f64], targets: ArrayView1<'_, f64>) -> f64 {
        if predictions.is_empty() {
            return 0.0;
        }
        let sum: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(&p, &y)| 0.5 * (p - y).powi(2))
            .sum();
        sum / predictions.len() as f64
    }
}
