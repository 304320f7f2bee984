//! 複数回の学習結果をまとめて検証します。
//!
//! コロケーション点数と繰り返し番号ごとに `out_res.json` を読み込み、
//! 有効粘性・流速・勾配の相対誤差を点数ごとに平均と標準偏差の半分で集計します。

use std::collections::BTreeMap;
use std::fs;

use anyhow::Context;
use plotters::prelude::BLACK;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::checkpoint::{self, RunResults};
use crate::config::{NetType, SweepConfig};
use crate::error::PinnError;
use crate::layout::SweepPaths;
use crate::plot::{self, Figure, Series};
use crate::sampling;
use crate::stats::{Spread, relative_l2};

/// 1回の学習の誤差。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunErrors {
    pub parameter: f64,
    pub field: f64,
    pub gradient: f64,
}

impl RunErrors {
    pub fn of(results: &RunResults, true_viscosity: f64) -> Result<Self, PinnError> {
        let last = results.last_viscosity().ok_or(PinnError::EmptyHistory)?;
        Ok(Self {
            parameter: (last as f64 - true_viscosity).abs() / true_viscosity,
            field: relative_l2(&results.u_pred, &results.valid_u)?,
            gradient: relative_l2(&results.u_grad, &results.valid_g)?,
        })
    }
}

/// ある点数での集計値。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountSummary {
    pub count: usize,
    pub parameter: Spread,
    pub field: Spread,
    pub gradient: Spread,
}

impl CountSummary {
    /// `errors` が空なら `None`。
    pub fn aggregate(count: usize, errors: &[RunErrors]) -> Option<Self> {
        let column = |f: fn(&RunErrors) -> f64| errors.iter().map(f).collect::<Vec<_>>();
        Some(Self {
            count,
            parameter: Spread::of(&column(|e| e.parameter))?,
            field: Spread::of(&column(|e| e.field))?,
            gradient: Spread::of(&column(|e| e.gradient))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetSummary {
    pub net_type: NetType,
    pub counts: Vec<CountSummary>,
}

/// `summary.json` の内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub nets: Vec<NetSummary>,
}

/// 図に使う代表の学習結果。
struct Representatives {
    field: BTreeMap<NetType, RunResults>,
    history: BTreeMap<NetType, RunResults>,
}

/// `sweep`サブコマンドの本体です。
pub fn run(config: &SweepConfig) -> anyhow::Result<SweepReport> {
    config.validate()?;
    let paths = SweepPaths::new(&config.root, &config.experiment);
    fs::create_dir_all(paths.valid_dir())
        .with_context(|| format!("'{}' を作成できません", paths.valid_dir().display()))?;

    let mut nets = Vec::with_capacity(config.nets.len());
    let mut reps = Representatives {
        field: BTreeMap::new(),
        history: BTreeMap::new(),
    };
    for &net_type in &config.nets {
        let mut counts = Vec::with_capacity(config.counts.len());
        for &count in &config.counts {
            let mut errors = Vec::with_capacity(config.repeats);
            for repeat in 1..=config.repeats {
                let file = paths.run(net_type, repeat, count).results_file();
                let results = checkpoint::load_results(&file)
                    .with_context(|| format!("'{}' を読み込めません", file.display()))?;
                let e = RunErrors::of(&results, config.true_viscosity)
                    .with_context(|| format!("'{}' の誤差を計算できません", file.display()))?;
                info!(
                    "{net_type} N = {count:3} #{repeat}: v_e {:.3e}, u {:.3e}, du/dx {:.3e}",
                    e.parameter, e.field, e.gradient
                );
                errors.push(e);

                if repeat == config.representative {
                    if count == config.overlay_count {
                        reps.field.insert(net_type, results.clone());
                    }
                    if count == config.history_count {
                        reps.history.insert(net_type, results);
                    }
                }
            }
            if let Some(summary) = CountSummary::aggregate(count, &errors) {
                info!(
                    "{net_type} N = {count:3}: v_e {:.3e} ± {:.1e}, u {:.3e} ± {:.1e}, du/dx {:.3e} ± {:.1e}",
                    summary.parameter.mean,
                    summary.parameter.half_std,
                    summary.field.mean,
                    summary.field.half_std,
                    summary.gradient.mean,
                    summary.gradient.half_std
                );
                counts.push(summary);
            }
        }
        nets.push(NetSummary { net_type, counts });
    }

    let report = SweepReport { nets };
    fs::write(paths.summary_file(), serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("'{}' に書き込めません", paths.summary_file().display()))?;
    info!("=> 集計結果を '{}' に保存しました。", paths.summary_file().display());

    if config.plots {
        plot_report(config, &paths, &report, &reps)?;
        info!("=> 図を '{}' に保存しました。", paths.valid_dir().display());
    }
    Ok(report)
}

fn plot_report(
    config: &SweepConfig,
    paths: &SweepPaths,
    report: &SweepReport,
    reps: &Representatives,
) -> anyhow::Result<()> {
    let panels: [(char, &str, fn(&CountSummary) -> Spread); 3] = [
        ('A', "L2 relative error of v_e", |s| s.parameter),
        ('B', "L2 relative error of u", |s| s.field),
        ('C', "L2 relative error of du/dx", |s| s.gradient),
    ];
    for (panel, y_desc, pick) in panels {
        let series: Vec<(NetType, Vec<Spread>)> = report
            .nets
            .iter()
            .map(|n| (n.net_type, n.counts.iter().map(pick).collect()))
            .collect();
        plot::error_bands(&paths.error_plot(panel), &config.counts, &series, y_desc)?;
    }

    let solution = config.solution();
    let observed = sampling::supervised(config.nx_sup, &solution)?;
    if let Some(first) = reps.field.values().next() {
        let xy = |y: &[f32]| -> Vec<(f64, f64)> {
            first
                .valid_x
                .iter()
                .zip(y)
                .map(|(&a, &b)| (a as f64, b as f64))
                .collect()
        };
        let mut figure = Figure::new("u", "x", "u")
            .with_series(Series::line("EXACT", xy(first.valid_u.as_slice()), BLACK));
        for (net_type, results) in &reps.field {
            figure = figure.with_series(Series::line(
                net_type.label(),
                xy(results.u_pred.as_slice()),
                plot::net_color(*net_type),
            ));
        }
        let obs = observed
            .x
            .iter()
            .zip(&observed.u)
            .map(|(&a, &b)| (a as f64, b as f64))
            .collect();
        figure
            .with_series(Series::markers("Observed", obs, BLACK))
            .save(&paths.field_overlay(config.overlay_count))?;
    }

    if !reps.history.is_empty() {
        let log = |v: f64| v.max(f64::MIN_POSITIVE).log10();
        let longest = reps
            .history
            .values()
            .map(|r| r.par_pred.len())
            .max()
            .unwrap_or(0);
        let mut figure = Figure::new("v_e", "Record", "v_e (log10 scale)").with_series(
            Series::line(
                "EXACT",
                (0..longest)
                    .map(|i| (i as f64, log(config.true_viscosity)))
                    .collect(),
                BLACK,
            ),
        );
        for (net_type, results) in &reps.history {
            let points = results
                .par_pred
                .iter()
                .enumerate()
                .map(|(i, &p)| (i as f64, log(p as f64)))
                .collect();
            figure = figure.with_series(Series::line(
                net_type.label(),
                points,
                plot::net_color(*net_type),
            ));
        }
        figure.save(&paths.history_overlay(config.history_count))?;
    }
    Ok(())
}
