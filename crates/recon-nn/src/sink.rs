// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use tracing::info;

/// Receives the per-step loss of a verbose fit.
pub trait LossSink {
    /// Records the loss observed at `step` (zero-based).
    fn record(&mut self, step: usize, loss: f32);
}

/// Default sink: one `INFO` event per step on the `recon::fit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLossSink;

impl LossSink for TracingLossSink {
    fn record(&mut self, step: usize, loss: f32) {
        info!(target: "recon::fit", step, loss, "Training loss: {loss}");
    }
}

/// Keeps every reported loss in memory, in the order it was reported.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingSink {
    records: Vec<(usize, f32)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(step, loss)` pairs seen so far.
    pub fn records(&self) -> &[(usize, f32)] {
        &self.records
    }

    pub fn losses(&self) -> Vec<f32> {
        self.records.iter().map(|(_, loss)| *loss).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LossSink for RecordingSink {
    fn record(&mut self, step: usize, loss: f32) {
        self.records.push((step, loss));
    }
}
