//! # Brinkman–Forchheimer 方程式の逆問題 PINN / gPINN
//!
//! `burn` フレームワークを使用して、多孔質中の 1 次元定常流れを表す
//! Brinkman–Forchheimer 方程式から、少数の観測値をもとに未知の有効粘性 `v_e` を推定します。
//!
//! 通常の PINN は方程式の残差を、gPINN はさらに残差の空間微分を罰します。
//! 高階の空間微分は [`jet`] の Taylor 展開で前進的に計算し、
//! パラメータに関する勾配だけを自動微分に任せます。
//!
//! ## 使い方
//!
//! ### 学習
//! ```bash
//! cargo run --release -- train --net-type gpinn --nx-eqs 30
//! ```
//!
//! ### 集計
//! ```bash
//! cargo run --release -- sweep --repeats 9
//! ```
//!
//! ### 推論
//! ```bash
//! cargo run --release -- infer --run-dir work/brinkman_forchheimer_1-gpinn-N_30
//! ```

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod jet;
pub mod layout;
pub mod logging;
pub mod model;
pub mod pinn;
pub mod plot;
pub mod sampling;
pub mod solution;
pub mod stats;
pub mod sweep;
pub mod training;

pub use error::PinnError;
