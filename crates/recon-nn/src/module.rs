// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use recon_tensor::{PureResult, Tensor, TensorError};

/// Trainable tensor paired with an Euclidean gradient accumulator.
///
/// The accumulator is created lazily on the first [`Parameter::accumulate`]
/// call and always has the same shape as the value. [`Parameter::apply_step`]
/// consumes it and leaves it zeroed for the next backward pass.
#[derive(Clone)]
pub struct Parameter {
    name: String,
    value: Tensor,
    gradient: Option<Tensor>,
}

impl core::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Parameter(name={},shape={:?},has_grad={})",
            self.name,
            self.value.shape(),
            self.gradient.is_some()
        )
    }
}

impl Parameter {
    /// Creates a new parameter with the provided tensor value.
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
            gradient: None,
        }
    }

    /// Returns the identifier assigned to the parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provides an immutable view into the underlying tensor value.
    pub fn value(&self) -> &Tensor {
        &self.value
    }

    /// Provides a mutable view into the underlying tensor value.
    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }

    /// Consumes the parameter and returns its value.
    pub fn into_value(self) -> Tensor {
        self.value
    }

    /// Returns the currently accumulated gradient, if any.
    pub fn gradient(&self) -> Option<&Tensor> {
        self.gradient.as_ref()
    }

    fn assert_shape(&self, tensor: &Tensor) -> PureResult<()> {
        if self.value.shape() != tensor.shape() {
            return Err(TensorError::ShapeMismatch {
                left: self.value.shape().to_vec(),
                right: tensor.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Adds `update` into the gradient buffer.
    pub fn accumulate(&mut self, update: &Tensor) -> PureResult<()> {
        self.assert_shape(update)?;
        match self.gradient.as_mut() {
            Some(existing) => existing.add_scaled(update, 1.0)?,
            None => self.gradient = Some(update.clone()),
        }
        Ok(())
    }

    /// Resets the gradient buffer to zero, keeping its allocation.
    pub fn zero_gradient(&mut self) {
        if let Some(grad) = self.gradient.as_mut() {
            grad.fill(0.0);
        }
    }

    /// Applies `value -= learning_rate * gradient` and zeroes the buffer.
    pub fn apply_step(&mut self, learning_rate: f32) -> PureResult<()> {
        if let Some(grad) = self.gradient.as_mut() {
            self.value.add_scaled(grad, -learning_rate)?;
            grad.fill(0.0);
        }
        Ok(())
    }
}

/// Differentiable building block with explicitly owned parameters.
pub trait Module {
    /// Runs a forward pass.
    fn forward(&self, input: &Tensor) -> PureResult<Tensor>;

    /// Propagates a gradient backwards. Implementations populate their
    /// parameter accumulators before returning the gradient with respect to
    /// `input`.
    fn backward(&mut self, input: &Tensor, grad_output: &Tensor) -> PureResult<Tensor>;

    /// Visits immutable parameters.
    fn visit_parameters(
        &self,
        visitor: &mut dyn FnMut(&Parameter) -> PureResult<()>,
    ) -> PureResult<()>;

    /// Visits mutable parameters.
    fn visit_parameters_mut(
        &mut self,
        visitor: &mut dyn FnMut(&mut Parameter) -> PureResult<()>,
    ) -> PureResult<()>;

    /// Applies the accumulated update to every parameter.
    fn apply_step(&mut self, learning_rate: f32) -> PureResult<()> {
        self.visit_parameters_mut(&mut |param| param.apply_step(learning_rate))
    }

    /// Clears accumulators across every parameter.
    fn zero_accumulators(&mut self) -> PureResult<()> {
        self.visit_parameters_mut(&mut |param| {
            param.zero_gradient();
            Ok(())
        })
    }
}
