// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Gradient-descent search for a two-dimensional reconstruction filter.
//!
//! A reconstruction filter `h` of shape `(1, channels, width)` maps a
//! multi-channel spike train `(1, channels, time)` onto a one-dimensional
//! envelope by cross-correlating every channel and summing the results. The
//! same machinery doubles as an imputation tool: train a filter on the
//! channels that are present and use it to fill in the one that is missing.

use crate::error::{ReconError, ReconResult};
use crate::layers::Correlate1d;
use crate::loss::{Loss, SumSquaredError};
use crate::module::Module;
use crate::sink::{LossSink, TracingLossSink};
use crate::trainer::GradientDescent;
use recon_tensor::{conv, Tensor};
use serde::{Deserialize, Serialize};
use tracing::debug_span;

/// Step size used when none is configured.
pub const DEFAULT_LEARNING_RATE: f32 = 1e-4;

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

fn default_verbose() -> bool {
    true
}

/// Serializable fitter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Number of gradient steps; always run to completion.
    pub n_runs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Report every step's loss to the sink.
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

impl FitConfig {
    pub fn new(n_runs: usize) -> Self {
        Self {
            n_runs,
            learning_rate: DEFAULT_LEARNING_RATE,
            verbose: true,
        }
    }

    pub fn validate(&self) -> ReconResult<()> {
        if self.n_runs == 0 {
            return Err(ReconError::InvalidRuns);
        }
        GradientDescent::new(self.learning_rate).map(|_| ())
    }
}

/// Sizes derived from a validated `(spikes, filter, envelope)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGeometry {
    pub channels: usize,
    pub spike_width: usize,
    pub filter_width: usize,
    /// Length of the estimated envelope, `spike_width - filter_width + 1`.
    pub output_width: usize,
}

/// Outcome of [`TwoDimReconstruction::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Envelope estimated on the last step, before that step's update.
    pub estimated_envelope: Tensor,
    /// Loss of every step in iteration order.
    pub loss_history: Vec<f32>,
}

impl FitReport {
    pub fn initial_loss(&self) -> Option<f32> {
        self.loss_history.first().copied()
    }

    pub fn final_loss(&self) -> Option<f32> {
        self.loss_history.last().copied()
    }
}

/// Returns `(channels, width)` when `shape` is `(1, channels >= 1, width >= 1)`.
fn single_batch(shape: &[usize]) -> Option<(usize, usize)> {
    match shape {
        [1, channels, width] if *channels >= 1 && *width >= 1 => Some((*channels, *width)),
        _ => None,
    }
}

/// Fits a reconstruction filter with a fixed number of gradient steps.
#[derive(Debug, Clone)]
pub struct TwoDimReconstruction {
    n_runs: usize,
    optimizer: GradientDescent,
    verbose: bool,
}

impl TwoDimReconstruction {
    /// Creates a verbose fitter running `n_runs` steps at
    /// [`DEFAULT_LEARNING_RATE`].
    pub fn new(n_runs: usize) -> ReconResult<Self> {
        Self::from_config(&FitConfig::new(n_runs))
    }

    pub fn from_config(config: &FitConfig) -> ReconResult<Self> {
        config.validate()?;
        Ok(Self {
            n_runs: config.n_runs,
            optimizer: GradientDescent::new(config.learning_rate)?,
            verbose: config.verbose,
        })
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> ReconResult<Self> {
        self.optimizer = GradientDescent::new(learning_rate)?;
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn config(&self) -> FitConfig {
        FitConfig {
            n_runs: self.n_runs,
            learning_rate: self.learning_rate(),
            verbose: self.verbose,
        }
    }

    /// Checks spikes and filter against the `(1, channels, time)` convention
    /// and against each other.
    fn validate_pair(spikes: &Tensor, filter: &Tensor) -> ReconResult<(usize, usize, usize)> {
        let (channels, spike_width) =
            single_batch(spikes.shape()).ok_or_else(|| ReconError::SpikeShape {
                shape: spikes.shape().to_vec(),
            })?;
        let (filter_channels, filter_width) =
            single_batch(filter.shape()).ok_or_else(|| ReconError::FilterShape {
                shape: filter.shape().to_vec(),
            })?;
        if filter_channels != channels {
            return Err(ReconError::ChannelMismatch {
                spikes: channels,
                filter: filter_channels,
            });
        }
        if filter_width > spike_width {
            return Err(ReconError::FilterTooWide {
                filter: filter_width,
                spikes: spike_width,
            });
        }
        Ok((channels, spike_width, filter_width))
    }

    /// Validates a fitting triple.
    ///
    /// The three layout checks run first, in the order spikes, filter,
    /// envelope. The cross-tensor checks (matching channels, filter no wider
    /// than the spikes, envelope covering the estimate) follow.
    pub fn validate_inputs(
        spikes: &Tensor,
        filter: &Tensor,
        envelope: &Tensor,
    ) -> ReconResult<InputGeometry> {
        if single_batch(spikes.shape()).is_none() {
            return Err(ReconError::SpikeShape {
                shape: spikes.shape().to_vec(),
            });
        }
        if single_batch(filter.shape()).is_none() {
            return Err(ReconError::FilterShape {
                shape: filter.shape().to_vec(),
            });
        }
        if envelope.rank() != 1 {
            return Err(ReconError::EnvelopeShape {
                shape: envelope.shape().to_vec(),
            });
        }
        let (channels, spike_width, filter_width) = Self::validate_pair(spikes, filter)?;
        let output_width = spike_width - filter_width + 1;
        if envelope.len() < output_width {
            return Err(ReconError::EnvelopeTooShort {
                required: output_width,
                got: envelope.len(),
            });
        }
        Ok(InputGeometry {
            channels,
            spike_width,
            filter_width,
            output_width,
        })
    }

    /// Fits `filter` in place, reporting losses through `tracing` when verbose.
    pub fn fit(
        &self,
        spikes: &Tensor,
        filter: &mut Tensor,
        envelope: &Tensor,
    ) -> ReconResult<FitReport> {
        self.fit_with_sink(spikes, filter, envelope, &mut TracingLossSink)
    }

    /// Fits `filter` in place, reporting losses to `sink` when verbose.
    ///
    /// Every step estimates the envelope, records the squared error against
    /// the first `output_width` envelope samples, and takes one gradient step
    /// on the filter. The returned estimate is the one computed on the final
    /// step, i.e. before the final update. `filter` is left untouched when
    /// validation fails.
    pub fn fit_with_sink(
        &self,
        spikes: &Tensor,
        filter: &mut Tensor,
        envelope: &Tensor,
        sink: &mut dyn LossSink,
    ) -> ReconResult<FitReport> {
        let geometry = Self::validate_inputs(spikes, filter, envelope)?;
        let span = debug_span!(
            "recon::fit",
            n_runs = self.n_runs,
            channels = geometry.channels,
            spike_width = geometry.spike_width,
            filter_width = geometry.filter_width,
        );
        let _entered = span.enter();

        let target = Tensor::from_vec(
            &[1, 1, geometry.output_width],
            envelope.data()[..geometry.output_width].to_vec(),
        )?;
        let mut layer = Correlate1d::new("reconstruction", filter.clone())?;
        let mut loss = SumSquaredError::new();
        let mut loss_history = Vec::with_capacity(self.n_runs);
        let mut estimate = None;

        for step in 0..self.n_runs {
            let prediction = layer.forward(spikes)?;
            let value = loss.forward(&prediction, &target)?;
            loss_history.push(value);
            if self.verbose {
                sink.record(step, value);
            }
            let grad = loss.backward(&prediction, &target)?;
            layer.backward_filter(spikes, &grad)?;
            self.optimizer.step(&mut layer)?;
            estimate = Some(prediction);
        }

        let estimate = estimate.ok_or(ReconError::InvalidRuns)?;
        *filter = layer.into_filter();
        Ok(FitReport {
            estimated_envelope: estimate.reshape(&[geometry.output_width])?,
            loss_history,
        })
    }

    /// Applies a filter to spikes and returns the rank-1 reconstructed envelope.
    pub fn reconstruct(spikes: &Tensor, filter: &Tensor) -> ReconResult<Tensor> {
        let (_, spike_width, filter_width) = Self::validate_pair(spikes, filter)?;
        let estimate = conv::correlate1d(spikes, filter)?;
        Ok(estimate.reshape(&[spike_width - filter_width + 1])?)
    }
}
