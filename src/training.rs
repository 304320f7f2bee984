use std::fs;
use std::time::Instant;

use anyhow::Context;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::{Backend, Tensor};
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;
use tracing::info;

use crate::checkpoint::{self, LossRecord, RunResults};
use crate::config::TrainConfig;
use crate::error::PinnError;
use crate::layout::RunPaths;
use crate::model::Model;
use crate::pinn::{loss_terms, validation_loss};
use crate::plot;
use crate::sampling::{Samples, TrainingData, values};

/// 記録時点での診断値。
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub losses: LossRecord,
    pub viscosity: f32,
    pub u_pred: Vec<f32>,
    pub u_grad: Vec<f32>,
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

/// 全損失項・推定パラメータ・検証格子上の予測値と勾配を評価します。
pub fn evaluate<B: Backend>(
    model: &Model<B>,
    data: &TrainingData<B>,
    config: &TrainConfig,
) -> Result<Diagnostics, PinnError> {
    let terms = loss_terms(model, data, &config.constants, config.net_type);
    let total = terms.objective(config.g_weight);
    let jet = model.jet(data.val_x.clone(), 1);
    Ok(Diagnostics {
        losses: LossRecord {
            equation: scalar(terms.equation),
            boundary: scalar(terms.boundary),
            supervision: scalar(terms.supervision),
            gradient: scalar(terms.gradient),
            validation: scalar(validation_loss(model, data)),
            total: scalar(total),
        },
        viscosity: scalar(model.viscosity()),
        u_pred: values(jet.value())?,
        u_grad: values(jet.derivative(1))?,
    })
}

fn record(results: &mut RunResults, epoch: usize, diag: &Diagnostics, cost: f32) {
    let l = &diag.losses;
    info!(
        "iter: {:6}, lr: {:.1e}, cost: {:.2}, val_loss: {:.2e}, v_e_pred: {:.2e}",
        epoch, results.config.learning_rate, cost, l.validation, diag.viscosity
    );
    info!(
        "EQs_loss: {:.2e}, BCS_loss: {:.2e}, Sup_loss: {:.2e}, Grad_loss: {:.2e}",
        l.equation, l.boundary, l.supervision, l.gradient
    );
    results.log_loss.push(diag.losses);
    results.par_pred.push(diag.viscosity);
}

fn save<B: Backend>(
    paths: &RunPaths,
    model: &Model<B>,
    results: &mut RunResults,
    samples: &Samples,
    epoch: usize,
    diag: Diagnostics,
) -> anyhow::Result<()> {
    results.epoch = epoch;
    results.u_pred = diag.u_pred;
    results.u_grad = diag.u_grad;

    let config = &results.config;
    if config.plots {
        plot::loss_history(&paths.loss_plot(), &results.log_loss, config.net_type)?;
        plot::parameter_history(&paths.parameter_plot(), &results.par_pred, config.true_viscosity)?;
        let sup = &samples.supervised;
        plot::field_comparison(
            &paths.field_plot(),
            &results.valid_x,
            &results.valid_u,
            &results.u_pred,
            config.net_type,
            Some((sup.x.as_slice(), sup.u.as_slice())),
            "u",
        )?;
        plot::field_comparison(
            &paths.gradient_plot(),
            &results.valid_x,
            &results.valid_g,
            &results.u_grad,
            config.net_type,
            None,
            "du/dx",
        )?;
    }

    checkpoint::save_model(&paths.model_file(), model)
        .with_context(|| format!("モデルを '{}' に保存できません", paths.model_file().display()))?;
    checkpoint::save_results(&paths.results_file(), results).with_context(|| {
        format!("結果を '{}' に保存できません", paths.results_file().display())
    })?;
    Ok(())
}

/// `train`サブコマンドの本体です。
///
/// 固定されたサンプル集合に対して全バッチの Adam 更新を `epochs` 回繰り返し、
/// 記録間隔ごとに損失を記録、保存間隔ごとに図とチェックポイントを上書きします。
/// ループ終了後にも最終状態を必ず保存します。
pub fn run<B: AutodiffBackend>(
    config: &TrainConfig,
    paths: &RunPaths,
    device: &B::Device,
) -> anyhow::Result<RunResults> {
    config.validate()?;
    paths
        .create()
        .with_context(|| format!("'{}' を作成できません", paths.root().display()))?;
    checkpoint::save_config(&paths.config_file(), config)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    B::seed(seed);
    info!("乱数シード: {seed}");

    // --- データセットの準備 ---
    let solution = config.solution();
    let samples = Samples::generate(config.nx_eqs, config.nx_sup, config.nx_val, &solution)?;
    info!("境界点: {:?}", samples.boundary.x);
    let train_data = TrainingData::<B>::new(&samples, device);
    let eval_data = TrainingData::<B::InnerBackend>::new(&samples, device);

    // --- モデルとオプティマイザの初期化 ---
    let mut model = config.model_config().init::<B>(device);
    let mut optim = AdamConfig::new().init();
    let mut results = RunResults {
        config: config.clone(),
        epoch: 0,
        log_loss: Vec::new(),
        par_pred: Vec::new(),
        valid_x: samples.validation.x.clone(),
        valid_u: samples.validation.u.clone(),
        valid_g: samples.validation.du.clone(),
        u_pred: Vec::new(),
        u_grad: Vec::new(),
    };

    info!(
        "学習を開始します ({}, Nx_EQs = {}) - バックエンド: NdArray (CPU)",
        config.net_type, config.nx_eqs
    );
    let training_start = Instant::now();
    let mut lap = Instant::now();
    let mut last_recorded = None;

    // --- 学習ループ ---
    for epoch in 0..config.epochs {
        let terms = loss_terms(&model, &train_data, &config.constants, config.net_type);
        let grads = terms.objective(config.g_weight).backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(config.learning_rate, model, grads);

        let print = epoch > 0 && epoch % config.print_freq == 0;
        let store = epoch > 0 && epoch % config.save_freq == 0;
        if !(print || store) {
            continue;
        }
        let diag = evaluate(&model.valid(), &eval_data, config)?;
        if print {
            record(&mut results, epoch, &diag, lap.elapsed().as_secs_f32());
            last_recorded = Some(epoch);
            lap = Instant::now();
        }
        if store {
            save(paths, &model, &mut results, &samples, epoch, diag)?;
        }
    }

    let final_epoch = config.epochs.saturating_sub(1);
    let diag = evaluate(&model.valid(), &eval_data, config)?;
    if last_recorded != Some(final_epoch) {
        record(&mut results, final_epoch, &diag, lap.elapsed().as_secs_f32());
    }
    save(paths, &model, &mut results, &samples, final_epoch, diag)?;
    info!("学習が完了しました。");
    info!("=> 学習時間: {:.2?}", training_start.elapsed());
    info!(
        "=> 推定された有効粘性: {:.4e} (真値 {:.1e})",
        results.last_viscosity().unwrap_or(f32::NAN),
        config.true_viscosity
    );

    let log = paths.log_file();
    if log.exists() {
        fs::copy(&log, paths.train_dir().join("train.log"))
            .with_context(|| format!("'{}' をコピーできません", log.display()))?;
    }
    Ok(results)
}
