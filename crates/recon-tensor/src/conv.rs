// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Single-batch 1-D cross-correlation ("convolution" in the machine-learning
//! sense: the kernel is not flipped) together with its two adjoints.
//!
//! Every kernel works on `(1, channels, time)` tensors. The forward pass sums
//! the per-channel correlations into a single output channel, which is the
//! same contraction as a one-output-channel `conv1d` without bias, padding,
//! stride or dilation.

use crate::pure::{PureResult, Tensor, TensorError};
use rayon::{current_num_threads, prelude::*};
use recon_config::determinism;

/// Minimum multiply-accumulate count before a kernel fans out across threads.
const PARALLEL_CORRELATE_THRESHOLD: usize = 1 << 16;

#[inline]
fn should_parallelize(work: usize) -> bool {
    if determinism::lock_reduction_order() || current_num_threads() <= 1 {
        return false;
    }
    work >= PARALLEL_CORRELATE_THRESHOLD
}

/// Returns `(channels, width)` for a `(1, channels, width)` tensor.
fn batch_channels_width(tensor: &Tensor) -> PureResult<(usize, usize)> {
    if tensor.rank() != 3 {
        return Err(TensorError::RankMismatch {
            expected: 3,
            got: tensor.rank(),
        });
    }
    let shape = tensor.shape();
    if shape[0] != 1 {
        return Err(TensorError::InvalidValue {
            label: "correlate1d_batch",
        });
    }
    Ok((shape[1], shape[2]))
}

fn output_width(signal_width: usize, kernel_width: usize) -> PureResult<usize> {
    if kernel_width == 0 || kernel_width > signal_width {
        return Err(TensorError::InvalidValue {
            label: "correlate1d_kernel_width",
        });
    }
    Ok(signal_width - kernel_width + 1)
}

fn ensure_channels(signal: usize, kernel: usize) -> PureResult<()> {
    if signal != kernel {
        return Err(TensorError::ShapeMismatch {
            left: vec![1, signal],
            right: vec![1, kernel],
        });
    }
    Ok(())
}

fn flat_output(grad_output: &Tensor, expected: usize) -> PureResult<&[f32]> {
    let flat_ok = match grad_output.shape() {
        [1, 1, n] => *n == expected,
        [n] => *n == expected,
        _ => false,
    };
    if !flat_ok {
        return Err(TensorError::ShapeMismatch {
            left: grad_output.shape().to_vec(),
            right: vec![1, 1, expected],
        });
    }
    Ok(grad_output.data())
}

#[inline]
fn correlate_at(
    signal: &[f32],
    kernel: &[f32],
    channels: usize,
    signal_width: usize,
    kernel_width: usize,
    offset: usize,
) -> f32 {
    let mut acc = 0.0f32;
    for c in 0..channels {
        let row = &signal[c * signal_width + offset..c * signal_width + offset + kernel_width];
        let taps = &kernel[c * kernel_width..(c + 1) * kernel_width];
        for (s, h) in row.iter().zip(taps.iter()) {
            acc += s * h;
        }
    }
    acc
}

/// Cross-correlates `signal` `(1, C, T1)` with `kernel` `(1, C, T2)`.
///
/// Returns a `(1, 1, T1 - T2 + 1)` tensor where
/// `out[i] = Σ_c Σ_k signal[c, i + k] · kernel[c, k]`.
pub fn correlate1d(signal: &Tensor, kernel: &Tensor) -> PureResult<Tensor> {
    let (channels, signal_width) = batch_channels_width(signal)?;
    let (kernel_channels, kernel_width) = batch_channels_width(kernel)?;
    ensure_channels(channels, kernel_channels)?;
    let out_width = output_width(signal_width, kernel_width)?;

    let signal_data = signal.data();
    let kernel_data = kernel.data();
    let mut out = vec![0.0f32; out_width];
    let compute = |(i, slot): (usize, &mut f32)| {
        *slot = correlate_at(
            signal_data,
            kernel_data,
            channels,
            signal_width,
            kernel_width,
            i,
        );
    };
    if should_parallelize(out_width * channels * kernel_width) {
        out.par_iter_mut().enumerate().for_each(compute);
    } else {
        out.iter_mut().enumerate().for_each(compute);
    }
    Tensor::from_vec(&[1, 1, out_width], out)
}

/// Gradient of a correlation output with respect to its kernel.
///
/// `grad_output` may be shaped `(1, 1, N)` or `(N,)`. The result has shape
/// `(1, C, kernel_width)` with `g[c, k] = Σ_i grad_output[i] · signal[c, i + k]`.
pub fn correlate1d_kernel_grad(
    signal: &Tensor,
    grad_output: &Tensor,
    kernel_width: usize,
) -> PureResult<Tensor> {
    let (channels, signal_width) = batch_channels_width(signal)?;
    let out_width = output_width(signal_width, kernel_width)?;
    let grad = flat_output(grad_output, out_width)?;
    let signal_data = signal.data();

    let mut out = vec![0.0f32; channels * kernel_width];
    let fill_channel = |(c, taps): (usize, &mut [f32])| {
        let row = &signal_data[c * signal_width..(c + 1) * signal_width];
        for (k, tap) in taps.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (g, s) in grad.iter().zip(row[k..k + out_width].iter()) {
                acc += g * s;
            }
            *tap = acc;
        }
    };
    if should_parallelize(out_width * channels * kernel_width) {
        out.par_chunks_mut(kernel_width)
            .enumerate()
            .for_each(fill_channel);
    } else {
        out.chunks_mut(kernel_width)
            .enumerate()
            .for_each(fill_channel);
    }
    Tensor::from_vec(&[1, channels, kernel_width], out)
}

/// Gradient of a correlation output with respect to its signal.
///
/// Returns a `(1, C, signal_width)` tensor with
/// `g[c, i + k] += grad_output[i] · kernel[c, k]`.
pub fn correlate1d_input_grad(
    kernel: &Tensor,
    grad_output: &Tensor,
    signal_width: usize,
) -> PureResult<Tensor> {
    let (channels, kernel_width) = batch_channels_width(kernel)?;
    let out_width = output_width(signal_width, kernel_width)?;
    let grad = flat_output(grad_output, out_width)?;
    let kernel_data = kernel.data();

    let mut out = vec![0.0f32; channels * signal_width];
    let fill_channel = |(c, row): (usize, &mut [f32])| {
        let taps = &kernel_data[c * kernel_width..(c + 1) * kernel_width];
        for (t, slot) in row.iter_mut().enumerate() {
            let lo = t.saturating_sub(kernel_width - 1);
            let hi = t.min(out_width - 1);
            let mut acc = 0.0f32;
            for i in lo..=hi {
                acc += grad[i] * taps[t - i];
            }
            *slot = acc;
        }
    };
    if should_parallelize(out_width * channels * kernel_width) {
        out.par_chunks_mut(signal_width)
            .enumerate()
            .for_each(fill_channel);
    } else {
        out.chunks_mut(signal_width)
            .enumerate()
            .for_each(fill_channel);
    }
    Tensor::from_vec(&[1, channels, signal_width], out)
}
