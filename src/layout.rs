//! 作業ディレクトリの構成。
//!
//! ```text
//! <run>/
//!   train.log  train_config.json  latest_model.mpk  out_res.json
//!   train/  train.log  log_loss.svg  par_pred.svg  pred_u.svg  grad_u.svg
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::NetType;

/// 1回の学習の出力先。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    root: PathBuf,
}

impl RunPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 単独実行時のディレクトリ `brinkman_forchheimer_1-<net>-N_<n><suffix>`。
    pub fn standalone(base: &Path, net_type: NetType, nx_eqs: usize, suffix: &str) -> Self {
        Self::new(base.join(format!(
            "brinkman_forchheimer_1-{net_type}-N_{nx_eqs}{suffix}"
        )))
    }

    /// スイープの 1 要素 `<experiment>/<net>+<id>-Nx_EQs_<n>`。
    pub fn sweep_member(
        base: &Path,
        experiment: &str,
        net_type: NetType,
        repeat: usize,
        nx_eqs: usize,
    ) -> Self {
        Self::new(
            base.join(experiment)
                .join(format!("{net_type}+{repeat}-Nx_EQs_{nx_eqs}")),
        )
    }

    /// 出力ディレクトリを作成します。
    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(self.train_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn train_dir(&self) -> PathBuf {
        self.root.join("train")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("train.log")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("train_config.json")
    }

    /// 拡張子 `.mpk` はレコーダが付与します。
    pub fn model_file(&self) -> PathBuf {
        self.root.join("latest_model")
    }

    pub fn results_file(&self) -> PathBuf {
        self.root.join("out_res.json")
    }

    pub fn loss_plot(&self) -> PathBuf {
        self.train_dir().join("log_loss.svg")
    }

    pub fn parameter_plot(&self) -> PathBuf {
        self.train_dir().join("par_pred.svg")
    }

    pub fn field_plot(&self) -> PathBuf {
        self.train_dir().join("pred_u.svg")
    }

    pub fn gradient_plot(&self) -> PathBuf {
        self.train_dir().join("grad_u.svg")
    }
}

/// スイープ検証の入出力先。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPaths {
    base: PathBuf,
    experiment: String,
}

impl SweepPaths {
    pub fn new(base: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            experiment: experiment.into(),
        }
    }

    pub fn run(&self, net_type: NetType, repeat: usize, nx_eqs: usize) -> RunPaths {
        RunPaths::sweep_member(&self.base, &self.experiment, net_type, repeat, nx_eqs)
    }

    pub fn valid_dir(&self) -> PathBuf {
        self.base.join(&self.experiment).join("valid")
    }

    pub fn log_file(&self) -> PathBuf {
        self.valid_dir().join("valid.log")
    }

    pub fn summary_file(&self) -> PathBuf {
        self.valid_dir().join("summary.json")
    }

    /// 誤差図 `Fig6_A.png` 〜 `Fig6_C.png`。
    pub fn error_plot(&self, panel: char) -> PathBuf {
        self.valid_dir().join(format!("Fig6_{panel}.png"))
    }

    pub fn field_overlay(&self, nx_eqs: usize) -> PathBuf {
        self.valid_dir().join(format!("Fig6_D-N{nx_eqs}.png"))
    }

    pub fn history_overlay(&self, nx_eqs: usize) -> PathBuf {
        self.valid_dir().join(format!("Fig6_E-N{nx_eqs}.png"))
    }
}
