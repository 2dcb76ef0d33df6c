// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

// Run with `RUST_LOG=info cargo run -p recon-nn --example synthetic_fit` to
// watch the per-step loss. Set `RECON_TRACE_CHROME=trace.json` to also capture
// a Chrome trace of the fit.

use recon_config::tracing::{ensure_tracing, flush_chrome_trace};
use recon_nn::{ReconResult, Tensor, TwoDimReconstruction};

const CHANNELS: usize = 4;
const SPIKE_WIDTH: usize = 256;
const FILTER_WIDTH: usize = 9;

fn main() -> ReconResult<()> {
    ensure_tracing();

    let truth = Tensor::random_normal(&[1, CHANNELS, FILTER_WIDTH], 0.0, 0.5, Some(7))?;
    let spikes = Tensor::random_uniform(&[1, CHANNELS, SPIKE_WIDTH], 0.0, 1.0, Some(8))?;
    let envelope = TwoDimReconstruction::reconstruct(&spikes, &truth)?;

    let mut filter = Tensor::zeros(&[1, CHANNELS, FILTER_WIDTH]);
    let fitter = TwoDimReconstruction::new(100)?;
    let report = fitter.fit(&spikes, &mut filter, &envelope)?;

    let mut residual = filter.clone();
    residual.add_scaled(&truth, -1.0)?;
    println!(
        "loss {:.4} -> {:.4}, filter error {:.4}",
        report.initial_loss().unwrap_or_default(),
        report.final_loss().unwrap_or_default(),
        residual.squared_l2_norm().sqrt()
    );

    flush_chrome_trace();
    Ok(())
}
