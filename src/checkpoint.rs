//! チェックポイントの保存と読み込み。
//!
//! モデルの重みは `latest_model.mpk`（`NamedMpkFileRecorder`）に、
//! 損失履歴や予測値は `out_res.json` に、同じ反復で上書き保存します。

use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};

use crate::config::TrainConfig;
use crate::error::PinnError;
use crate::model::Model;

/// 記録間隔ごとの損失。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub equation: f32,
    pub boundary: f32,
    pub supervision: f32,
    pub gradient: f32,
    pub validation: f32,
    pub total: f32,
}

/// `out_res.json` の内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub config: TrainConfig,
    /// 最後に保存した反復番号
    pub epoch: usize,
    pub log_loss: Vec<LossRecord>,
    pub par_pred: Vec<f32>,
    pub valid_x: Vec<f32>,
    pub valid_u: Vec<f32>,
    pub valid_g: Vec<f32>,
    pub u_pred: Vec<f32>,
    pub u_grad: Vec<f32>,
}

impl RunResults {
    /// 最新の推定パラメータ。記録が無ければ `None`。
    pub fn last_viscosity(&self) -> Option<f32> {
        self.par_pred.last().copied()
    }
}

pub fn save_results(path: &Path, results: &RunResults) -> Result<(), PinnError> {
    fs::write(path, serde_json::to_string(results)?)?;
    tracing::debug!("結果を '{}' に保存しました", path.display());
    Ok(())
}

pub fn load_results(path: &Path) -> Result<RunResults, PinnError> {
    if !path.exists() {
        return Err(PinnError::MissingCheckpoint(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

pub fn save_config(path: &Path, config: &TrainConfig) -> Result<(), PinnError> {
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

pub fn load_config(path: &Path) -> Result<TrainConfig, PinnError> {
    if !path.exists() {
        return Err(PinnError::MissingCheckpoint(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// モデルの重みを保存します。パスに拡張子は付けません。
pub fn save_model<B: Backend>(path: &Path, model: &Model<B>) -> Result<(), PinnError> {
    model.clone().save_file(path, &recorder())?;
    Ok(())
}

/// 設定から同じ構造のモデルを組み立て、保存済みの重みを読み込みます。
pub fn load_model<B: Backend>(
    path: &Path,
    config: &TrainConfig,
    device: &B::Device,
) -> Result<Model<B>, PinnError> {
    let file = path.with_extension("mpk");
    if !file.exists() {
        return Err(PinnError::MissingCheckpoint(file));
    }
    let model = config
        .model_config()
        .init::<B>(device)
        .load_file(path, &recorder(), device)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::column;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn results() -> RunResults {
        RunResults {
            config: TrainConfig::default(),
            epoch: 4000,
            log_loss: vec![LossRecord {
                equation: 1.0,
                boundary: 0.0,
                supervision: 0.5,
                gradient: 2.0,
                validation: 0.25,
                total: 1.7,
            }],
            par_pred: vec![0.05, 0.002],
            valid_x: vec![0.0, 1.0],
            valid_u: vec![0.0, 0.0],
            valid_g: vec![19.0, -19.0],
            u_pred: vec![0.0, 0.0],
            u_grad: vec![18.5, -18.0],
        }
    }

    #[test]
    fn results_survive_a_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_res.json");
        save_results(&path, &results()).unwrap();
        let loaded = load_results(&path).unwrap();
        assert_eq!(loaded, results());
        assert_eq!(loaded.last_viscosity(), Some(0.002));
    }

    #[test]
    fn missing_results_are_reported_with_their_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_res.json");
        match load_results(&path) {
            Err(PinnError::MissingCheckpoint(p)) => assert_eq!(p, path),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn model_weights_reload_into_the_same_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = TrainConfig {
            hidden_width: 8,
            hidden_layers: 2,
            ..TrainConfig::default()
        };
        let model = config.model_config().init::<TestBackend>(&device);
        let path = dir.path().join("latest_model");
        save_model(&path, &model).unwrap();

        let loaded = load_model::<TestBackend>(&path, &config, &device).unwrap();
        let x = column::<TestBackend>(&[0.25, 0.5], &device);
        let a = model.predict(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.predict(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }
}
