use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PinnError;
use crate::model::ModelConfig;
use crate::solution::{PhysicalConstants, ReferenceSolution, TRUE_VISCOSITY};

/// 残差の種類。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NetType {
    /// 方程式の残差のみを用いる通常の PINN
    Pinn,
    /// 残差の空間微分も罰する gradient-enhanced PINN
    Gpinn,
}

impl NetType {
    pub fn is_gradient_enhanced(self) -> bool {
        matches!(self, NetType::Gpinn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NetType::Pinn => "pinn",
            NetType::Gpinn => "gpinn",
        }
    }

    /// 図の凡例に使う表記
    pub fn label(self) -> &'static str {
        match self {
            NetType::Pinn => "PINN",
            NetType::Gpinn => "GPINN",
        }
    }
}

impl fmt::Display for NetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1回の学習の設定。`train_config.json` として保存されます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub net_type: NetType,
    pub epochs: usize,
    pub print_freq: usize,
    pub save_freq: usize,
    pub device: usize,
    pub work_name: String,
    pub nx_eqs: usize,
    pub nx_sup: usize,
    pub nx_val: usize,
    pub g_weight: f64,
    pub learning_rate: f64,
    pub hidden_width: usize,
    pub hidden_layers: usize,
    pub seed: Option<u64>,
    pub plots: bool,
    pub constants: PhysicalConstants,
    pub true_viscosity: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            net_type: NetType::Gpinn,
            epochs: 60_000,
            print_freq: 2000,
            save_freq: 2000,
            device: 0,
            work_name: String::new(),
            nx_eqs: 30,
            nx_sup: 5,
            nx_val: 500,
            g_weight: 0.1,
            learning_rate: 1e-3,
            hidden_width: 20,
            hidden_layers: 3,
            seed: None,
            plots: true,
            constants: PhysicalConstants::default(),
            true_viscosity: TRUE_VISCOSITY,
        }
    }
}

impl TrainConfig {
    /// 学習前に設定の整合性を確認します。
    pub fn validate(&self) -> Result<(), PinnError> {
        if self.print_freq == 0 || self.save_freq == 0 {
            return Err(PinnError::InvalidConfig(
                "print_freq と save_freq は 1 以上である必要があります".into(),
            ));
        }
        if self.hidden_width == 0 || self.hidden_layers == 0 {
            return Err(PinnError::InvalidConfig(
                "隠れ層の幅と数は 1 以上である必要があります".into(),
            ));
        }
        if !(self.learning_rate > 0.0) || !(self.g_weight >= 0.0) {
            return Err(PinnError::InvalidConfig(format!(
                "learning_rate ({}) は正、g_weight ({}) は非負である必要があります",
                self.learning_rate, self.g_weight
            )));
        }
        let c = &self.constants;
        if [c.g, c.v, c.k, c.e, c.h, self.true_viscosity]
            .iter()
            .any(|&p| !(p > 0.0))
        {
            return Err(PinnError::InvalidConfig(
                "物理定数はすべて正である必要があります".into(),
            ));
        }
        Ok(())
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new()
            .with_hidden_width(self.hidden_width)
            .with_hidden_layers(self.hidden_layers)
            .with_domain_length(self.constants.h)
    }

    pub fn solution(&self) -> ReferenceSolution {
        ReferenceSolution::new(self.constants, self.true_viscosity)
    }
}

/// パラメータスイープ検証の設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub root: PathBuf,
    pub experiment: String,
    pub nets: Vec<NetType>,
    pub counts: Vec<usize>,
    /// 繰り返し番号は `1..=repeats`
    pub repeats: usize,
    /// 流速の比較図に使うコロケーション点数
    pub overlay_count: usize,
    /// パラメータ履歴の比較図に使うコロケーション点数
    pub history_count: usize,
    /// 代表として図示する繰り返し番号
    pub representative: usize,
    pub nx_sup: usize,
    pub plots: bool,
    pub constants: PhysicalConstants,
    pub true_viscosity: f64,
}

/// スイープ対象の既定の実験名
pub const DEFAULT_EXPERIMENT: &str = "Brinkman-Forchheimer-1";

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("work"),
            experiment: DEFAULT_EXPERIMENT.to_string(),
            nets: vec![NetType::Pinn, NetType::Gpinn],
            counts: vec![5, 10, 15, 20, 25, 30],
            repeats: 9,
            overlay_count: 10,
            history_count: 15,
            representative: 1,
            nx_sup: 5,
            plots: true,
            constants: PhysicalConstants::default(),
            true_viscosity: TRUE_VISCOSITY,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), PinnError> {
        if self.nets.is_empty() || self.counts.is_empty() || self.repeats == 0 {
            return Err(PinnError::InvalidConfig(
                "ネットワーク種別・点数・繰り返し回数は空にできません".into(),
            ));
        }
        if self.representative == 0 || self.representative > self.repeats {
            return Err(PinnError::InvalidConfig(format!(
                "代表の繰り返し番号 {} は 1..={} の範囲外です",
                self.representative, self.repeats
            )));
        }
        // 比較図に使う点数は集計対象に含まれている必要がある
        if self.plots {
            for (flag, count) in [
                ("overlay_count", self.overlay_count),
                ("history_count", self.history_count),
            ] {
                if !self.counts.contains(&count) {
                    return Err(PinnError::InvalidConfig(format!(
                        "{flag} ({count}) が点数の一覧 {:?} に含まれていません",
                        self.counts
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn solution(&self) -> ReferenceSolution {
        ReferenceSolution::new(self.constants, self.true_viscosity)
    }
}
