use crate::checkpoint;
use crate::layout::RunPaths;
use crate::sampling::{self, column};
use crate::stats::relative_l2;
use burn::prelude::Backend;
use burn::tensor::ElementConversion;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// 保存済みモデルの評価結果。
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub viscosity: f64,
    pub viscosity_error: f64,
    pub field_error: f64,
    pub gradient_error: f64,
}

/// `infer`サブコマンドを実行します。
///
/// 学習済みのモデルを読み込み、`points` 点の格子で解析解と比較します。
pub fn run<B: Backend>(
    run_dir: &Path,
    points: usize,
    device: &B::Device,
) -> anyhow::Result<Evaluation> {
    let paths = RunPaths::new(run_dir);
    let config = checkpoint::load_config(&paths.config_file())?;

    info!("推論を実行します - バックエンド: NdArray (CPU)");
    let inference_start = Instant::now();

    info!(
        "保存済みモデルを '{}' からロード中...",
        paths.model_file().display()
    );
    let model = checkpoint::load_model::<B>(&paths.model_file(), &config, device)?;

    let solution = config.solution();
    let grid = sampling::uniform(points, "points", &solution)?;
    let jet = model.jet(column(&grid.x, device), 1);
    let u_pred = sampling::values(jet.value())?;
    let u_grad = sampling::values(jet.derivative(1))?;
    let viscosity = model.viscosity().into_scalar().elem::<f64>();

    let evaluation = Evaluation {
        viscosity,
        viscosity_error: (viscosity - config.true_viscosity).abs() / config.true_viscosity,
        field_error: relative_l2(&u_pred, &grid.u)?,
        gradient_error: relative_l2(&u_grad, &grid.du)?,
    };
    info!(
        "推論が完了しました。格子点数: {}, v_e: {:.4e} (相対誤差 {:.2e})",
        points, evaluation.viscosity, evaluation.viscosity_error
    );
    info!(
        "=> u の相対L2誤差: {:.3e}, du/dx の相対L2誤差: {:.3e}",
        evaluation.field_error, evaluation.gradient_error
    );
    info!("=> 推論時間: {:.2?}", inference_start.elapsed());
    Ok(evaluation)
}
