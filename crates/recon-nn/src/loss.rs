// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use recon_tensor::{PureResult, Tensor, TensorError};

/// Trait implemented by differentiable losses that compare a prediction with
/// a target of identical shape.
pub trait Loss {
    /// Computes the scalar loss value.
    fn forward(&mut self, prediction: &Tensor, target: &Tensor) -> PureResult<f32>;

    /// Returns the gradient of the loss with respect to the prediction.
    fn backward(&mut self, prediction: &Tensor, target: &Tensor) -> PureResult<Tensor>;
}

fn ensure_same_shape(prediction: &Tensor, target: &Tensor) -> PureResult<()> {
    if prediction.shape() != target.shape() {
        return Err(TensorError::ShapeMismatch {
            left: prediction.shape().to_vec(),
            right: target.shape().to_vec(),
        });
    }
    Ok(())
}

/// Squared error with sum reduction: `Σ (p - t)²`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SumSquaredError;

impl SumSquaredError {
    /// Creates a new summed squared error loss instance.
    pub fn new() -> Self {
        Self
    }
}

impl Loss for SumSquaredError {
    fn forward(&mut self, prediction: &Tensor, target: &Tensor) -> PureResult<f32> {
        ensure_same_shape(prediction, target)?;
        let mut sum = 0.0f32;
        for (pred, tgt) in prediction.data().iter().zip(target.data().iter()) {
            let diff = pred - tgt;
            sum += diff * diff;
        }
        Ok(sum)
    }

    fn backward(&mut self, prediction: &Tensor, target: &Tensor) -> PureResult<Tensor> {
        ensure_same_shape(prediction, target)?;
        Ok(prediction.sub(target)?.scale(2.0))
    }
}
