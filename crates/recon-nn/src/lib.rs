// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Fitting of two-dimensional reconstruction filters.
//!
//! A multi-channel spike train is mapped onto a one-dimensional envelope by a
//! learned per-channel cross-correlation filter. [`TwoDimReconstruction`]
//! searches for that filter with plain gradient descent over a fixed number of
//! steps; the remaining modules provide the layer, loss and stepper it is
//! assembled from.

pub mod error;
pub mod layers;
pub mod loss;
pub mod module;
pub mod reconstruction;
pub mod sink;
pub mod trainer;

pub use error::{ReconError, ReconResult};
pub use layers::Correlate1d;
pub use loss::{Loss, SumSquaredError};
pub use module::{Module, Parameter};
pub use reconstruction::{
    FitConfig, FitReport, InputGeometry, TwoDimReconstruction, DEFAULT_LEARNING_RATE,
};
pub use sink::{LossSink, RecordingSink, TracingLossSink};
pub use trainer::GradientDescent;

pub use recon_tensor::{PureResult, Tensor, TensorError};
