use std::io;
use std::sync::{Arc, Mutex};

use recon_nn::{
    Correlate1d, FitConfig, Module, ReconError, RecordingSink, Tensor, TwoDimReconstruction,
    DEFAULT_LEARNING_RATE,
};

fn quiet(n_runs: usize, learning_rate: f32) -> TwoDimReconstruction {
    TwoDimReconstruction::new(n_runs)
        .unwrap()
        .with_learning_rate(learning_rate)
        .unwrap()
        .with_verbose(false)
}

#[test]
fn worked_example_first_step() {
    let spikes = Tensor::from_vec(&[1, 1, 5], vec![1.0; 5]).unwrap();
    let mut filter = Tensor::zeros(&[1, 1, 2]);
    let envelope = Tensor::from_vec(&[4], vec![2.0; 4]).unwrap();
    let fitter = TwoDimReconstruction::new(1)
        .unwrap()
        .with_learning_rate(0.1)
        .unwrap();

    let mut sink = RecordingSink::new();
    let report = fitter
        .fit_with_sink(&spikes, &mut filter, &envelope, &mut sink)
        .unwrap();

    assert_eq!(sink.records(), &[(0, 16.0)]);
    assert_eq!(report.loss_history, vec![16.0]);
    assert_eq!(report.estimated_envelope.shape(), &[4]);
    assert_eq!(report.estimated_envelope.data(), &[0.0; 4]);
    assert_eq!(filter.shape(), &[1, 1, 2]);
    for tap in filter.data() {
        assert!((tap - 1.6).abs() < 1e-6, "tap {tap}");
    }
}

/// Shared buffer handed to the fmt layer as its writer.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs the single-step worked example under a capturing subscriber.
fn logged_worked_example(verbose: bool) -> String {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(true)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let spikes = Tensor::from_vec(&[1, 1, 5], vec![1.0; 5]).unwrap();
        let mut filter = Tensor::zeros(&[1, 1, 2]);
        let envelope = Tensor::from_vec(&[4], vec![2.0; 4]).unwrap();
        TwoDimReconstruction::new(1)
            .unwrap()
            .with_learning_rate(0.1)
            .unwrap()
            .with_verbose(verbose)
            .fit(&spikes, &mut filter, &envelope)
            .unwrap();
    });
    log.contents()
}

#[test]
fn verbose_fit_logs_one_line_per_step() {
    let output = logged_worked_example(true);
    let lines: Vec<&str> = output
        .lines()
        .filter(|line| line.contains("Training loss:"))
        .collect();
    assert_eq!(lines.len(), 1, "captured: {output}");
    assert!(lines[0].contains("INFO"), "line: {}", lines[0]);
    assert!(lines[0].contains("recon::fit"), "line: {}", lines[0]);
    assert!(lines[0].contains("Training loss: 16"), "line: {}", lines[0]);
}

#[test]
fn quiet_fit_logs_nothing() {
    let output = logged_worked_example(false);
    assert!(!output.contains("Training loss"), "captured: {output}");
}

#[test]
fn estimated_envelope_length_is_output_width() {
    for (channels, t1, t2) in [(1, 5, 1), (3, 12, 4), (2, 7, 7)] {
        let spikes = Tensor::random_normal(&[1, channels, t1], 0.0, 1.0, Some(1)).unwrap();
        let mut filter = Tensor::random_normal(&[1, channels, t2], 0.0, 0.1, Some(2)).unwrap();
        let envelope = Tensor::zeros(&[t1]);
        let report = quiet(2, 1e-3).fit(&spikes, &mut filter, &envelope).unwrap();
        assert_eq!(report.estimated_envelope.len(), t1 - t2 + 1);
        assert_eq!(filter.shape(), &[1, channels, t2]);
    }
}

#[test]
fn loss_history_has_one_non_negative_entry_per_run() {
    let spikes = Tensor::random_normal(&[1, 2, 20], 0.0, 1.0, Some(3)).unwrap();
    let mut filter = Tensor::random_normal(&[1, 2, 4], 0.0, 0.5, Some(4)).unwrap();
    let envelope = Tensor::random_normal(&[17], 0.0, 1.0, Some(5)).unwrap();
    let mut sink = RecordingSink::new();
    let report = TwoDimReconstruction::new(25)
        .unwrap()
        .with_learning_rate(1e-3)
        .unwrap()
        .fit_with_sink(&spikes, &mut filter, &envelope, &mut sink)
        .unwrap();

    assert_eq!(report.loss_history.len(), 25);
    assert!(report.loss_history.iter().all(|loss| *loss >= 0.0));
    let steps: Vec<usize> = sink.records().iter().map(|(step, _)| *step).collect();
    assert_eq!(steps, (0..25).collect::<Vec<_>>());
    assert_eq!(sink.losses(), report.loss_history);
}

#[test]
fn quiet_fit_reports_nothing() {
    let spikes = Tensor::from_vec(&[1, 1, 4], vec![1.0, 0.0, 1.0, 0.0]).unwrap();
    let mut filter = Tensor::zeros(&[1, 1, 2]);
    let envelope = Tensor::from_vec(&[3], vec![1.0, 1.0, 1.0]).unwrap();
    let mut sink = RecordingSink::new();
    let report = quiet(4, 0.05)
        .fit_with_sink(&spikes, &mut filter, &envelope, &mut sink)
        .unwrap();
    assert!(sink.is_empty());
    assert_eq!(report.loss_history.len(), 4);
}

#[test]
fn near_optimal_start_converges() {
    let truth = Tensor::random_normal(&[1, 2, 5], 0.0, 1.0, Some(10)).unwrap();
    let spikes = Tensor::random_normal(&[1, 2, 64], 0.0, 1.0, Some(11)).unwrap();
    let envelope = TwoDimReconstruction::reconstruct(&spikes, &truth).unwrap();

    let noise = Tensor::random_normal(&[1, 2, 5], 0.0, 0.05, Some(12)).unwrap();
    let mut filter = truth.clone();
    filter.add_scaled(&noise, 1.0).unwrap();

    let report = quiet(200, 1e-3)
        .fit(&spikes, &mut filter, &envelope)
        .unwrap();
    let initial = report.initial_loss().unwrap();
    let last = report.final_loss().unwrap();
    assert!(initial > 0.0);
    assert!(last < initial, "loss went from {initial} to {last}");

    let mut residual = filter.clone();
    residual.add_scaled(&truth, -1.0).unwrap();
    assert!(residual.squared_l2_norm() < noise.squared_l2_norm());
}

#[test]
fn silent_spikes_freeze_the_filter() {
    let spikes = Tensor::zeros(&[1, 3, 10]);
    let mut filter = Tensor::random_normal(&[1, 3, 4], 0.0, 1.0, Some(20)).unwrap();
    let before = filter.clone();
    let envelope = Tensor::from_vec(&[7], vec![1.0, -2.0, 0.5, 0.0, 3.0, 1.0, -1.0]).unwrap();
    let energy: f32 = envelope.squared_l2_norm();

    let report = quiet(5, 0.1).fit(&spikes, &mut filter, &envelope).unwrap();
    assert_eq!(report.estimated_envelope.data(), &[0.0; 7]);
    assert_eq!(filter, before);
    for loss in &report.loss_history {
        assert!((loss - energy).abs() < 1e-5);
    }
}

#[test]
fn filter_is_updated_once_per_run() {
    let spikes = Tensor::from_vec(&[1, 1, 5], vec![1.0; 5]).unwrap();
    let envelope = Tensor::from_vec(&[4], vec![2.0; 4]).unwrap();

    let mut manual = Correlate1d::new("manual", Tensor::zeros(&[1, 1, 2])).unwrap();
    let target = Tensor::from_vec(&[1, 1, 4], vec![2.0; 4]).unwrap();
    for _ in 0..3 {
        let prediction = manual.forward(&spikes).unwrap();
        let grad = prediction.sub(&target).unwrap().scale(2.0);
        manual.backward(&spikes, &grad).unwrap();
        manual.apply_step(0.01).unwrap();
    }

    let mut filter = Tensor::zeros(&[1, 1, 2]);
    quiet(3, 0.01).fit(&spikes, &mut filter, &envelope).unwrap();
    for (fitted, expected) in filter.data().iter().zip(manual.filter().value().data()) {
        assert!((fitted - expected).abs() < 1e-6);
    }
}

#[test]
fn config_round_trips_through_json() {
    let config: FitConfig = serde_json::from_str(r#"{ "n_runs": 50 }"#).unwrap();
    assert_eq!(config.n_runs, 50);
    assert_eq!(config.learning_rate, DEFAULT_LEARNING_RATE);
    assert!(config.verbose);

    let custom = FitConfig {
        n_runs: 10,
        learning_rate: 0.25,
        verbose: false,
    };
    let encoded = serde_json::to_string(&custom).unwrap();
    let decoded: FitConfig = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, custom);

    let fitter = TwoDimReconstruction::from_config(&decoded).unwrap();
    assert_eq!(fitter.config(), custom);

    let zero: FitConfig = serde_json::from_str(r#"{ "n_runs": 0 }"#).unwrap();
    assert_eq!(zero.validate(), Err(ReconError::InvalidRuns));
}
