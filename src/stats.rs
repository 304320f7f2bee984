use serde::{Deserialize, Serialize};

use crate::error::PinnError;

/// 相対 L2 誤差 `‖pred − truth‖ / ‖truth‖`。
pub fn relative_l2(pred: &[f32], truth: &[f32]) -> Result<f64, PinnError> {
    if pred.len() != truth.len() {
        return Err(PinnError::ShapeMismatch {
            expected: truth.len(),
            got: pred.len(),
        });
    }
    let (diff, norm) = pred
        .iter()
        .zip(truth)
        .fold((0.0_f64, 0.0_f64), |(d, n), (&p, &t)| {
            let (p, t) = (p as f64, t as f64);
            (d + (p - t).powi(2), n + t * t)
        });
    Ok(diff.sqrt() / norm.sqrt())
}

/// 平均と標準偏差の半分（母標準偏差）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub mean: f64,
    pub half_std: f64,
}

impl Spread {
    /// 空の配列に対しては `None` を返します。
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            half_std: var.sqrt() / 2.0,
        })
    }

    pub fn lower(&self) -> f64 {
        self.mean - self.half_std
    }

    pub fn upper(&self) -> f64 {
        self.mean + self.half_std
    }
}
