//! Brinkman–Forchheimer 方程式の解析解。
//!
//! `-(ν_e / e) u'' + (v / K) u = g`、`u(0) = u(H) = 0` の解は双曲線余弦で表されます。

use serde::{Deserialize, Serialize};

/// 方程式に現れる物理定数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// 外力項
    pub g: f64,
    /// 流体の粘性係数
    pub v: f64,
    /// 透水係数
    pub k: f64,
    /// 空隙率
    pub e: f64,
    /// 領域の長さ
    pub h: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            g: 1.0,
            v: 1e-3,
            k: 1e-3,
            e: 0.4,
            h: 1.0,
        }
    }
}

/// 真の有効粘性 `ν_e` を与えたときの解析解。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSolution {
    pub constants: PhysicalConstants,
    pub viscosity: f64,
}

/// 推定対象となる有効粘性の真値
pub const TRUE_VISCOSITY: f64 = 1e-3;

impl Default for ReferenceSolution {
    fn default() -> Self {
        Self::new(PhysicalConstants::default(), TRUE_VISCOSITY)
    }
}

impl ReferenceSolution {
    pub fn new(constants: PhysicalConstants, viscosity: f64) -> Self {
        Self {
            constants,
            viscosity,
        }
    }

    fn rate(&self) -> f64 {
        let c = &self.constants;
        (c.v * c.e / (self.viscosity * c.k)).sqrt()
    }

    fn amplitude(&self) -> f64 {
        let c = &self.constants;
        c.g * c.k / c.v
    }

    /// 位置 `x` における解 `u(x)`。
    pub fn value(&self, x: f64) -> f64 {
        let r = self.rate();
        let half = self.constants.h / 2.0;
        self.amplitude() * (1.0 - (r * (x - half)).cosh() / (r * half).cosh())
    }

    /// 位置 `x` における勾配 `du/dx`。
    pub fn gradient(&self, x: f64) -> f64 {
        let r = self.rate();
        let half = self.constants.h / 2.0;
        -self.amplitude() * r * (r * (x - half)).sinh() / (r * half).cosh()
    }
}
