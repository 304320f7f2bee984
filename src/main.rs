use bf_pinn::cli::Cli;
use clap::Parser;

/// メイン関数。コマンドライン引数を解析し、対応する処理を呼び出します。
fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
