// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{ReconError, ReconResult};
use crate::module::Module;
use recon_tensor::PureResult;

/// Plain fixed-step gradient descent: `θ ← θ − η·∂L/∂θ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a stepper with the provided learning rate, which must be a
    /// positive finite number.
    pub fn new(learning_rate: f32) -> ReconResult<Self> {
        if !(learning_rate > 0.0) || !learning_rate.is_finite() {
            return Err(ReconError::InvalidLearningRate {
                rate: learning_rate,
            });
        }
        Ok(Self { learning_rate })
    }

    /// Returns the step size.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Clears accumulated gradients.
    pub fn zero<M: Module>(&self, module: &mut M) -> PureResult<()> {
        module.zero_accumulators()
    }

    /// Applies the accumulated gradients and leaves the buffers zeroed.
    pub fn step<M: Module>(&self, module: &mut M) -> PureResult<()> {
        module.apply_step(self.learning_rate)
    }
}
