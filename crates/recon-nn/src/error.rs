// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use recon_tensor::TensorError;
use thiserror::Error;

/// Result alias used by the fitting layer.
pub type ReconResult<T> = Result<T, ReconError>;

/// Errors raised while configuring a fitter or validating its inputs.
///
/// Shape errors are always raised before any computation so a failed call
/// never mutates the filter.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ReconError {
    /// The spike tensor is not shaped `(1, channels, time)`.
    #[error("invalid spikes shape {shape:?}, requires shape (1, channels, time)")]
    SpikeShape { shape: Vec<usize> },
    /// The filter tensor is not shaped `(1, channels, time)`.
    #[error("invalid filter shape {shape:?}, requires shape (1, channels, time)")]
    FilterShape { shape: Vec<usize> },
    /// The envelope tensor is not one-dimensional.
    #[error("invalid envelope shape {shape:?}, requires shape (time,)")]
    EnvelopeShape { shape: Vec<usize> },
    /// Spikes and filter disagree on the channel count.
    #[error("spikes carry {spikes} channels but the filter carries {filter}")]
    ChannelMismatch { spikes: usize, filter: usize },
    /// The filter is longer than the spike train it slides over.
    #[error("filter width {filter} exceeds spike width {spikes}")]
    FilterTooWide { filter: usize, spikes: usize },
    /// The envelope does not cover every estimated sample.
    #[error("envelope holds {got} samples but {required} are estimated")]
    EnvelopeTooShort { required: usize, got: usize },
    /// The fitter was asked to run zero gradient steps.
    #[error("number of runs must be at least one")]
    InvalidRuns,
    /// The learning rate is not a positive finite number.
    #[error("learning rate must be positive and finite, got {rate}")]
    InvalidLearningRate { rate: f32 },
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
