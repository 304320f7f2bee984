use bf_pinn::checkpoint::{self, RunResults};
use bf_pinn::config::{NetType, SweepConfig, TrainConfig};
use bf_pinn::layout::SweepPaths;
use bf_pinn::sweep::{self, SweepReport};
use bf_pinn::PinnError;

/// 流速を `scale` 倍した予測と最終推定値 `nu` を持つ学習結果。
fn synthetic(net_type: NetType, count: usize, nu: f32, scale: f32) -> RunResults {
    let x = vec![0.0, 0.25, 0.5, 0.75, 1.0];
    let u = vec![0.0, 0.75, 1.0, 0.75, 0.0];
    let g = vec![2.0, 1.0, 0.0, -1.0, -2.0];
    RunResults {
        config: TrainConfig {
            net_type,
            nx_eqs: count,
            ..TrainConfig::default()
        },
        epoch: 100,
        log_loss: Vec::new(),
        par_pred: vec![0.069, nu],
        u_pred: u.iter().map(|v| v * scale).collect(),
        u_grad: g.iter().map(|v| v * scale).collect(),
        valid_x: x,
        valid_u: u,
        valid_g: g,
    }
}

fn write_runs(config: &SweepConfig) {
    let paths = SweepPaths::new(&config.root, &config.experiment);
    for &net_type in &config.nets {
        for &count in &config.counts {
            for repeat in 1..=config.repeats {
                let run = paths.run(net_type, repeat, count);
                run.create().unwrap();
                // 繰り返しごとに粘性の誤差を 10% と 30% に振り分ける
                let nu = if repeat == 1 { 1.1e-3 } else { 1.3e-3 };
                let results = synthetic(net_type, count, nu, 1.0 + 0.01 * count as f32);
                checkpoint::save_results(&run.results_file(), &results).unwrap();
            }
        }
    }
}

fn config(root: &std::path::Path) -> SweepConfig {
    SweepConfig {
        root: root.to_path_buf(),
        experiment: "exp".to_string(),
        nets: vec![NetType::Pinn, NetType::Gpinn],
        counts: vec![5, 10],
        repeats: 2,
        overlay_count: 10,
        history_count: 5,
        plots: false,
        ..SweepConfig::default()
    }
}

#[test]
fn sweep_aggregates_every_net_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    write_runs(&config);

    let report = sweep::run(&config).unwrap();

    assert_eq!(report.nets.len(), 2);
    for net in &report.nets {
        assert_eq!(net.counts.len(), 2);
        for summary in &net.counts {
            assert!((summary.parameter.mean - 0.2).abs() < 1e-4);
            assert!((summary.parameter.half_std - 0.05).abs() < 1e-4);
            let expected = 0.01 * summary.count as f64;
            assert!((summary.field.mean - expected).abs() < 1e-5);
            assert!((summary.gradient.mean - expected).abs() < 1e-5);
            assert!(summary.field.half_std < 1e-6);
        }
    }

    let paths = SweepPaths::new(&config.root, &config.experiment);
    let json = std::fs::read_to_string(paths.summary_file()).unwrap();
    let saved: SweepReport = serde_json::from_str(&json).unwrap();
    assert_eq!(saved.nets.len(), report.nets.len());
    for (s, r) in saved.nets.iter().zip(&report.nets) {
        assert_eq!(s.net_type, r.net_type);
        let counts = |n: &bf_pinn::sweep::NetSummary| n.counts.iter().map(|c| c.count).collect::<Vec<_>>();
        assert_eq!(counts(s), counts(r));
    }
}

#[test]
fn sweep_reports_the_missing_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    write_runs(&config);
    config.repeats = 3;

    let err = sweep::run(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PinnError>(),
        Some(PinnError::MissingCheckpoint(_))
    ));
}
