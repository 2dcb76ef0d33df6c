// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::module::{Module, Parameter};
use recon_tensor::{conv, PureResult, Tensor, TensorError};

/// Multi-channel 1-D cross-correlation with a single output channel.
///
/// Holds one `(1, channels, width)` filter. Inputs are `(1, channels, time)`
/// signals and outputs are `(1, 1, time - width + 1)` envelopes.
#[derive(Debug, Clone)]
pub struct Correlate1d {
    filter: Parameter,
    channels: usize,
    width: usize,
}

impl Correlate1d {
    /// Wraps an existing `(1, channels, width)` filter.
    pub fn new(name: impl Into<String>, filter: Tensor) -> PureResult<Self> {
        let (channels, width) = match filter.shape() {
            [1, c, w] if *c > 0 && *w > 0 => (*c, *w),
            _ => {
                return Err(TensorError::InvalidValue {
                    label: "correlate1d_filter_shape",
                })
            }
        };
        let name = name.into();
        Ok(Self {
            filter: Parameter::new(format!("{name}::filter"), filter),
            channels,
            width,
        })
    }

    /// Builds a layer whose filter taps are drawn from `N(0, std²)`.
    pub fn random(
        name: impl Into<String>,
        channels: usize,
        width: usize,
        std: f32,
        seed: Option<u64>,
    ) -> PureResult<Self> {
        let filter = Tensor::random_normal(&[1, channels, width], 0.0, std, seed)?;
        Self::new(name, filter)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the filter parameter.
    pub fn filter(&self) -> &Parameter {
        &self.filter
    }

    /// Accumulates the filter gradient for `grad_output` without computing the
    /// gradient with respect to `input`.
    pub fn backward_filter(&mut self, input: &Tensor, grad_output: &Tensor) -> PureResult<()> {
        let grad_filter = conv::correlate1d_kernel_grad(input, grad_output, self.width)?;
        self.filter.accumulate(&grad_filter)
    }

    /// Consumes the layer and returns the filter tensor.
    pub fn into_filter(self) -> Tensor {
        self.filter.into_value()
    }
}

impl Module for Correlate1d {
    fn forward(&self, input: &Tensor) -> PureResult<Tensor> {
        conv::correlate1d(input, self.filter.value())
    }

    fn backward(&mut self, input: &Tensor, grad_output: &Tensor) -> PureResult<Tensor> {
        let signal_width = input.dim(2)?;
        self.backward_filter(input, grad_output)?;
        conv::correlate1d_input_grad(self.filter.value(), grad_output, signal_width)
    }

    fn visit_parameters(
        &self,
        visitor: &mut dyn FnMut(&Parameter) -> PureResult<()>,
    ) -> PureResult<()> {
        visitor(&self.filter)
    }

    fn visit_parameters_mut(
        &mut self,
        visitor: &mut dyn FnMut(&mut Parameter) -> PureResult<()>,
    ) -> PureResult<()> {
        visitor(&mut self.filter)
    }
}
