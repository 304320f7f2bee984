use std::path::PathBuf;

use thiserror::Error;

/// ライブラリ全体で使用するエラー型。
#[derive(Debug, Error)]
pub enum PinnError {
    /// サンプル点数が不足しています。
    #[error("{name} には少なくとも {min} 点が必要です (指定: {got})")]
    InvalidSampleCount {
        name: &'static str,
        min: usize,
        got: usize,
    },

    #[error("設定が不正です: {0}")]
    InvalidConfig(String),

    /// 学習済みの結果ファイルが見つかりません。
    #[error("チェックポイント '{}' が見つかりません。先に 'train' を実行してください", .0.display())]
    MissingCheckpoint(PathBuf),

    #[error("配列の長さが一致しません: 期待値 {expected}, 実際 {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("推定パラメータの記録がありません")]
    EmptyHistory,

    /// テンソルから数値を取り出せませんでした。
    #[error("テンソルデータの変換に失敗しました: {0}")]
    TensorData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Recorder(#[from] burn::record::RecorderError),
}
