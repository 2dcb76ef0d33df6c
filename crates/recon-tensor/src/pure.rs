// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense, row-major `f32` tensors of arbitrary rank.
//!
//! The tensor deliberately accepts any shape whose volume matches its data,
//! including zero-length axes and rank 0. Callers that need a particular
//! layout (the `(1, channels, time)` convention used by the correlation
//! kernels, for instance) validate it themselves and report the violation in
//! their own vocabulary.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use recon_config::determinism;
use std::sync::Arc;
use thiserror::Error;

/// Result alias used throughout the tensor crate.
pub type PureResult<T> = Result<T, TensorError>;

/// Errors emitted by tensor constructors and kernels.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TensorError {
    /// Data provided to a constructor does not match the tensor volume.
    #[error("data length mismatch: expected {expected}, got {got}")]
    DataLength { expected: usize, got: usize },
    /// An operator was asked to combine tensors of incompatible shapes.
    #[error("shape mismatch: left={left:?}, right={right:?} cannot be combined")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },
    /// A kernel expected a tensor of a different rank.
    #[error("rank mismatch: expected rank {expected}, got rank {got}")]
    RankMismatch { expected: usize, got: usize },
    /// An axis index exceeded the tensor rank.
    #[error("axis {axis} is out of range for a rank-{rank} tensor")]
    AxisOutOfRange { axis: usize, rank: usize },
    /// Generic configuration violation.
    #[error("invalid value for {label}")]
    InvalidValue { label: &'static str },
}

/// A dense tensor backed by a reference-counted buffer.
///
/// Clones share storage until one side mutates, at which point the writer
/// receives its own copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Arc<Vec<f32>>,
}

fn volume(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl Tensor {
    fn seedable_rng(seed: Option<u64>, label: &str) -> StdRng {
        determinism::rng_from_optional(seed, label)
    }

    /// Create a tensor from raw data. The vector must hold exactly
    /// `shape.iter().product()` elements.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> PureResult<Self> {
        let expected = volume(shape);
        if expected != data.len() {
            return Err(TensorError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data: Arc::new(data),
        })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            data: Arc::new(vec![0.0; volume(shape)]),
        }
    }

    /// Construct a tensor by applying a generator to each flat, row-major index.
    pub fn from_fn<F>(shape: &[usize], f: F) -> Self
    where
        F: FnMut(usize) -> f32,
    {
        let data = (0..volume(shape)).map(f).collect();
        Self {
            shape: shape.to_vec(),
            data: Arc::new(data),
        }
    }

    /// Construct a tensor by sampling a normal distribution.
    ///
    /// When `seed` is provided the RNG becomes deterministic which makes tests
    /// reproducible. Otherwise the process-wide determinism settings decide.
    pub fn random_normal(
        shape: &[usize],
        mean: f32,
        std: f32,
        seed: Option<u64>,
    ) -> PureResult<Self> {
        if !(std > 0.0) || !std.is_finite() {
            return Err(TensorError::InvalidValue {
                label: "random_normal_std",
            });
        }
        let mut rng = Self::seedable_rng(seed, "recon-tensor/tensor/normal");
        Ok(Self::from_fn(shape, |_| {
            let sample: f64 = StandardNormal.sample(&mut rng);
            mean + std * sample as f32
        }))
    }

    /// Construct a tensor by sampling a uniform distribution in `[min, max)`.
    pub fn random_uniform(
        shape: &[usize],
        min: f32,
        max: f32,
        seed: Option<u64>,
    ) -> PureResult<Self> {
        if !(min < max) {
            return Err(TensorError::InvalidValue {
                label: "random_uniform_bounds",
            });
        }
        let mut rng = Self::seedable_rng(seed, "recon-tensor/tensor/uniform");
        let distribution = Uniform::new(min, max);
        Ok(Self::from_fn(shape, |_| distribution.sample(&mut rng)))
    }

    /// Returns the tensor shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Length of a single axis.
    pub fn dim(&self, axis: usize) -> PureResult<usize> {
        self.shape
            .get(axis)
            .copied()
            .ok_or(TensorError::AxisOutOfRange {
                axis,
                rank: self.rank(),
            })
    }

    /// Total number of elements stored in the tensor.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a read-only view of the row-major buffer.
    pub fn data(&self) -> &[f32] {
        self.data.as_slice()
    }

    /// Returns a mutable view of the row-major buffer, detaching shared storage.
    pub fn data_mut(&mut self) -> &mut [f32] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Returns a tensor sharing this buffer under a new shape of equal volume.
    pub fn reshape(&self, shape: &[usize]) -> PureResult<Tensor> {
        let expected = volume(shape);
        if expected != self.len() {
            return Err(TensorError::DataLength {
                expected,
                got: self.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data: Arc::clone(&self.data),
        })
    }

    fn ensure_same_shape(&self, other: &Tensor) -> PureResult<()> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }
        Ok(())
    }

    /// Element-wise subtraction.
    pub fn sub(&self, other: &Tensor) -> PureResult<Tensor> {
        self.ensure_same_shape(other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect();
        Tensor::from_vec(&self.shape, data)
    }

    /// Returns a new tensor where every element is scaled by `value`.
    pub fn scale(&self, value: f32) -> Tensor {
        Self {
            shape: self.shape.clone(),
            data: Arc::new(self.data.iter().map(|a| a * value).collect()),
        }
    }

    /// Add a scaled tensor to this tensor (`self += scale * other`).
    pub fn add_scaled(&mut self, other: &Tensor, scale: f32) -> PureResult<()> {
        self.ensure_same_shape(other)?;
        let data = Arc::make_mut(&mut self.data);
        for (a, b) in data.iter_mut().zip(other.data.iter()) {
            *a += scale * b;
        }
        Ok(())
    }

    /// Overwrites every element with `value`.
    pub fn fill(&mut self, value: f32) {
        for slot in self.data_mut() {
            *slot = value;
        }
    }

    /// Sum of squared elements.
    pub fn squared_l2_norm(&self) -> f32 {
        self.data.iter().map(|v| v * v).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_checks_volume() {
        let err = Tensor::from_vec(&[1, 2, 3], vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            TensorError::DataLength {
                expected: 6,
                got: 5
            }
        );
        let t = Tensor::from_vec(&[1, 2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(t.shape(), &[1, 2, 3]);
        assert_eq!(t.rank(), 3);
        assert_eq!(t.dim(2).unwrap(), 3);
        assert!(matches!(
            t.dim(3),
            Err(TensorError::AxisOutOfRange { axis: 3, rank: 3 })
        ));
    }

    #[test]
    fn zero_length_axes_are_representable() {
        let t = Tensor::zeros(&[1, 0, 4]);
        assert!(t.is_empty());
        assert_eq!(t.shape(), &[1, 0, 4]);
    }

    #[test]
    fn clones_detach_on_write() {
        let a = Tensor::from_vec(&[3], vec![1.0, 2.0, 3.0]).unwrap();
        let mut b = a.clone();
        b.data_mut()[0] = 10.0;
        assert_eq!(a.data(), &[1.0, 2.0, 3.0]);
        assert_eq!(b.data(), &[10.0, 2.0, 3.0]);
    }

    #[test]
    fn add_scaled_and_sub() {
        let mut a = Tensor::from_vec(&[2], vec![1.0, 1.0]).unwrap();
        let b = Tensor::from_vec(&[2], vec![2.0, -4.0]).unwrap();
        a.add_scaled(&b, 0.5).unwrap();
        assert_eq!(a.data(), &[2.0, -1.0]);
        let diff = a.sub(&b).unwrap();
        assert_eq!(diff.data(), &[0.0, 3.0]);
        assert!(matches!(
            a.sub(&Tensor::zeros(&[3])),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn reshape_keeps_data() {
        let a = Tensor::from_vec(&[1, 1, 4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let flat = a.reshape(&[4]).unwrap();
        assert_eq!(flat.data(), a.data());
        assert!(a.reshape(&[5]).is_err());
    }

    #[test]
    fn seeded_random_tensors_repeat() {
        let a = Tensor::random_normal(&[1, 2, 8], 0.0, 1.0, Some(9)).unwrap();
        let b = Tensor::random_normal(&[1, 2, 8], 0.0, 1.0, Some(9)).unwrap();
        assert_eq!(a, b);
        let u = Tensor::random_uniform(&[16], -1.0, 1.0, Some(3)).unwrap();
        assert!(u.data().iter().all(|v| (-1.0..1.0).contains(v)));
        assert!(Tensor::random_normal(&[2], 0.0, 0.0, None).is_err());
        assert!(Tensor::random_uniform(&[2], 1.0, 1.0, None).is_err());
    }

    #[test]
    fn squared_norm_and_fill() {
        let mut t = Tensor::from_vec(&[2], vec![3.0, 4.0]).unwrap();
        assert_eq!(t.squared_l2_norm(), 25.0);
        t.fill(0.0);
        assert_eq!(t.squared_l2_norm(), 0.0);
    }
}
