use std::path::PathBuf;

use anyhow::Context;
use burn::backend::{Autodiff, NdArray};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{DEFAULT_EXPERIMENT, NetType, SweepConfig, TrainConfig};
use crate::layout::{RunPaths, SweepPaths};
use crate::{inference, logging, sweep, training};

/// 学習に用いるバックエンド (自動微分付きの CPU バックエンド)
pub type MyBackend = Autodiff<NdArray<f32>>;
/// 推論に用いるバックエンド
pub type InferBackend = NdArray<f32>;

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Brinkman-Forchheimer 方程式の有効粘性を PINN / gPINN で推定します",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// モデルを学習し、結果をファイルに保存します
    Train(TrainArgs),
    /// 繰り返し学習の結果を集計し、誤差の図を作成します
    Sweep(SweepArgs),
    /// 保存されたモデルを使い、解析解と比較します
    Infer(InferArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// 残差の種類
    #[arg(long, value_enum, default_value_t = NetType::Gpinn)]
    pub net_type: NetType,
    #[arg(long, default_value_t = 60_000)]
    pub epochs: usize,
    /// 損失を記録する間隔
    #[arg(long, default_value_t = 2000)]
    pub print_freq: usize,
    /// 図とチェックポイントを保存する間隔
    #[arg(long, default_value_t = 2000)]
    pub save_freq: usize,
    /// デバイス番号 (CPU バックエンドでは 0 のみ)
    #[arg(long, default_value_t = 0)]
    pub device: usize,
    /// 出力ディレクトリ名に付ける接尾辞
    #[arg(long, default_value = "")]
    pub work_name: String,
    /// コロケーション点数
    #[arg(long, default_value_t = 30)]
    pub nx_eqs: usize,
    /// 観測点数
    #[arg(long, default_value_t = 5)]
    pub nx_sup: usize,
    /// 検証格子の点数
    #[arg(long, default_value_t = 500)]
    pub nx_val: usize,
    /// 勾配損失の重み
    #[arg(long, default_value_t = 0.1)]
    pub g_weight: f64,
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,
    #[arg(long, default_value_t = 20)]
    pub hidden_width: usize,
    #[arg(long, default_value_t = 3)]
    pub hidden_layers: usize,
    /// 乱数シード (省略時はランダム)
    #[arg(long)]
    pub seed: Option<u64>,
    /// 出力のルートディレクトリ
    #[arg(long, default_value = "work")]
    pub root: PathBuf,
    /// 図を作成しない
    #[arg(long)]
    pub no_plots: bool,
    /// スイープの構成で保存する実験名 (`--repeat` と併用)
    #[arg(long, requires = "repeat")]
    pub experiment: Option<String>,
    /// スイープ内の繰り返し番号
    #[arg(long, requires = "experiment")]
    pub repeat: Option<usize>,
}

impl From<&TrainArgs> for TrainConfig {
    fn from(args: &TrainArgs) -> Self {
        Self {
            net_type: args.net_type,
            epochs: args.epochs,
            print_freq: args.print_freq,
            save_freq: args.save_freq,
            device: args.device,
            work_name: args.work_name.clone(),
            nx_eqs: args.nx_eqs,
            nx_sup: args.nx_sup,
            nx_val: args.nx_val,
            g_weight: args.g_weight,
            learning_rate: args.learning_rate,
            hidden_width: args.hidden_width,
            hidden_layers: args.hidden_layers,
            seed: args.seed,
            plots: !args.no_plots,
            ..TrainConfig::default()
        }
    }
}

impl TrainArgs {
    /// 出力先を決めます。
    pub fn paths(&self) -> RunPaths {
        match (&self.experiment, self.repeat) {
            (Some(experiment), Some(repeat)) => RunPaths::sweep_member(
                &self.root,
                experiment,
                self.net_type,
                repeat,
                self.nx_eqs,
            ),
            _ => RunPaths::standalone(&self.root, self.net_type, self.nx_eqs, &self.work_name),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// 学習結果のルートディレクトリ
    #[arg(long, default_value = "work")]
    pub root: PathBuf,
    /// 集計する実験名
    #[arg(long, default_value = DEFAULT_EXPERIMENT)]
    pub experiment: String,
    /// 比較するネットワーク (カンマ区切り)
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [NetType::Pinn, NetType::Gpinn])]
    pub nets: Vec<NetType>,
    /// コロケーション点数 (カンマ区切り)
    #[arg(long, value_delimiter = ',', default_values_t = [5, 10, 15, 20, 25, 30])]
    pub counts: Vec<usize>,
    /// 点数ごとの繰り返し回数 (番号は 1 から)
    #[arg(long, default_value_t = 9)]
    pub repeats: usize,
    /// 流速の比較図に使うコロケーション点数
    #[arg(long, default_value_t = 10)]
    pub overlay_count: usize,
    /// 有効粘性の履歴図に使うコロケーション点数
    #[arg(long, default_value_t = 15)]
    pub history_count: usize,
    /// 流速の比較図に描く観測点数
    #[arg(long, default_value_t = 5)]
    pub nx_sup: usize,
    /// 図を作成しない
    #[arg(long)]
    pub no_plots: bool,
}

impl From<&SweepArgs> for SweepConfig {
    fn from(args: &SweepArgs) -> Self {
        Self {
            root: args.root.clone(),
            experiment: args.experiment.clone(),
            nets: args.nets.clone(),
            counts: args.counts.clone(),
            repeats: args.repeats,
            overlay_count: args.overlay_count,
            history_count: args.history_count,
            nx_sup: args.nx_sup,
            plots: !args.no_plots,
            ..SweepConfig::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct InferArgs {
    /// 学習結果のディレクトリ
    #[arg(long)]
    pub run_dir: PathBuf,
    /// 評価する格子点数
    #[arg(long, default_value_t = 500)]
    pub points: usize,
}

impl Cli {
    /// コマンドに応じて処理を分岐させます。
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Train(args) => {
                let paths = args.paths();
                paths
                    .create()
                    .with_context(|| format!("'{}' を作成できません", paths.root().display()))?;
                logging::init(Some(&paths.log_file()))?;
                if args.device != 0 {
                    warn!(
                        "デバイス {} が指定されましたが、CPU バックエンドのため無視します",
                        args.device
                    );
                }
                info!("出力先: {}", paths.root().display());
                let device = Default::default();
                training::run::<MyBackend>(&TrainConfig::from(&args), &paths, &device)?;
            }
            Commands::Sweep(args) => {
                let config = SweepConfig::from(&args);
                let paths = SweepPaths::new(&config.root, &config.experiment);
                std::fs::create_dir_all(paths.valid_dir()).with_context(|| {
                    format!("'{}' を作成できません", paths.valid_dir().display())
                })?;
                logging::init(Some(&paths.log_file()))?;
                sweep::run(&config)?;
            }
            Commands::Infer(args) => {
                logging::init(None)?;
                let device = Default::default();
                inference::run::<InferBackend>(&args.run_dir, args.points, &device)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["bf-pinn", "train"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("train を期待しました");
        };
        assert_eq!(TrainConfig::from(&args), TrainConfig::default());
        assert_eq!(
            args.paths().root(),
            Path::new("work/brinkman_forchheimer_1-gpinn-N_30")
        );
    }

    #[test]
    fn experiment_places_run_in_sweep_layout() {
        let cli = Cli::try_parse_from([
            "bf-pinn", "train", "--net-type", "pinn", "--nx-eqs", "10", "--experiment", "exp",
            "--repeat", "3", "--no-plots",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("train を期待しました");
        };
        assert_eq!(args.paths().root(), Path::new("work/exp/pinn+3-Nx_EQs_10"));
        assert!(!TrainConfig::from(&args).plots);
    }

    #[test]
    fn repeat_requires_experiment() {
        assert!(Cli::try_parse_from(["bf-pinn", "train", "--repeat", "1"]).is_err());
    }

    #[test]
    fn every_sweep_flag_has_help() {
        let cmd = <Cli as clap::CommandFactory>::command();
        let sweep = cmd.find_subcommand("sweep").unwrap();
        for arg in sweep.get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "version") {
                continue;
            }
            assert!(arg.get_help().is_some(), "--{} に説明がありません", arg.get_id());
        }
    }

    #[test]
    fn sweep_lists_are_comma_separated() {
        let cli =
            Cli::try_parse_from(["bf-pinn", "sweep", "--nets", "gpinn", "--counts", "5,10"])
                .unwrap();
        let Commands::Sweep(args) = cli.command else {
            panic!("sweep を期待しました");
        };
        let config = SweepConfig::from(&args);
        assert_eq!(config.nets, vec![NetType::Gpinn]);
        assert_eq!(config.counts, vec![5, 10]);
        assert_eq!(config.repeats, 9);
        assert_eq!(config.experiment, DEFAULT_EXPERIMENT);
    }
}
