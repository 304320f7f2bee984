use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// `RUST_LOG` が未設定のときのフィルタ
pub const DEFAULT_FILTER: &str = "bf_pinn=info";

/// ログ出力を初期化します。
///
/// 標準エラー出力に加え、`log_file` が与えられればそのファイルにも同じ内容を書き込みます。
pub fn init(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(File::create(path)?)),
        ),
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;
    Ok(())
}
