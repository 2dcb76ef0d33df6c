// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

// crates/recon-tensor/src/lib.rs
pub mod conv;
pub mod pure;

pub use conv::{correlate1d, correlate1d_input_grad, correlate1d_kernel_grad};
pub use pure::{PureResult, Tensor, TensorError};
