//! 前進モードの高階微分（ジェット）。
//!
//! 値とその `x` に関する 1〜3 階微分をまとめて層ごとに伝播させます。
//! すべて `burn` のテンソル演算で組み立てるため、Autodiff バックエンド上では
//! 各微分項からネットワークのパラメータへ逆伝播できます。

use burn::nn::Linear;
use burn::prelude::{Backend, Tensor};

/// 扱える最大の微分階数
pub const MAX_ORDER: usize = 3;

/// `terms[k]` に `k` 階微分を保持します。
#[derive(Debug, Clone)]
pub struct Jet<B: Backend> {
    terms: Vec<Tensor<B, 2>>,
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

impl<B: Backend> Jet<B> {
    /// 独立変数 `x` そのもののジェット (`x' = 1`, 高階は 0)。
    pub fn variable(x: Tensor<B, 2>, order: usize) -> Self {
        let order = order.min(MAX_ORDER);
        let mut terms = Vec::with_capacity(order + 1);
        if order >= 1 {
            terms.push(x.ones_like());
        }
        for _ in 2..=order {
            terms.push(x.zeros_like());
        }
        terms.insert(0, x);
        Self { terms }
    }

    pub fn order(&self) -> usize {
        self.terms.len() - 1
    }

    /// `k` 階微分。`k` は `order()` 以下である必要があります。
    pub fn derivative(&self, k: usize) -> Tensor<B, 2> {
        self.terms[k].clone()
    }

    pub fn value(&self) -> Tensor<B, 2> {
        self.derivative(0)
    }

    /// `scale · f + shift`
    pub fn affine(self, scale: f64, shift: f64) -> Self {
        let terms = self
            .terms
            .into_iter()
            .enumerate()
            .map(|(k, t)| {
                let t = t.mul_scalar(scale);
                if k == 0 { t.add_scalar(shift) } else { t }
            })
            .collect();
        Self { terms }
    }

    /// 全結合層を適用します。バイアスは値の項にのみ加わります。
    pub fn linear(self, layer: &Linear<B>) -> Self {
        let weight = layer.weight.val();
        let mut terms = Vec::with_capacity(self.terms.len());
        for (k, t) in self.terms.into_iter().enumerate() {
            if k == 0 {
                terms.push(layer.forward(t));
            } else {
                terms.push(t.matmul(weight.clone()));
            }
        }
        Self { terms }
    }

    /// `tanh` を Faà di Bruno の公式で合成します。
    pub fn tanh(self) -> Self {
        let order = self.order();
        let z = self.terms;
        let t = z[0].clone().tanh();
        if order == 0 {
            return Self { terms: vec![t] };
        }

        // tanh' = s, tanh'' = -2ts, tanh''' = s(6t^2 - 2)
        let t2 = t.clone() * t.clone();
        let s = t2.clone().neg().add_scalar(1.0);
        let mut terms = vec![t.clone(), s.clone() * z[1].clone()];
        if order >= 2 {
            let f2 = (t * s.clone()).mul_scalar(-2.0);
            let z1_sq = z[1].clone() * z[1].clone();
            terms.push(s.clone() * z[2].clone() + f2.clone() * z1_sq.clone());
            if order >= 3 {
                let f3 = s.clone() * t2.mul_scalar(6.0).add_scalar(-2.0);
                let cross = (f2 * z[1].clone() * z[2].clone()).mul_scalar(3.0);
                terms.push(s * z[3].clone() + cross + f3 * z1_sq * z[1].clone());
            }
        }
        Self { terms }
    }

    /// 積の微分を Leibniz の公式で計算します。階数は低い方に揃えます。
    pub fn mul(self, other: Self) -> Self {
        let order = self.order().min(other.order());
        let terms = (0..=order)
            .map(|n| {
                (0..=n)
                    .map(|k| {
                        let term = self.terms[k].clone() * other.terms[n - k].clone();
                        let c = binomial(n, k);
                        if c == 1.0 { term } else { term.mul_scalar(c) }
                    })
                    .reduce(|acc, term| acc + term)
                    .unwrap_or_else(|| self.terms[0].zeros_like())
            })
            .collect();
        Self { terms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::column;
    use burn::backend::NdArray;
    use burn::nn::LinearConfig;

    type TestBackend = NdArray<f32>;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn assert_close(actual: Tensor<TestBackend, 2>, expected: &[f64]) {
        for (a, e) in values(actual).iter().zip(expected) {
            assert!((*a as f64 - e).abs() < 1e-4, "{a} != {e}");
        }
    }

    #[test]
    fn tanh_derivatives_match_closed_form() {
        let device = Default::default();
        let xs = [-0.7_f32, 0.0, 0.4, 1.3];
        let jet = Jet::variable(column::<TestBackend>(&xs, &device), 3)
            .affine(2.0, 0.5)
            .tanh();

        // f(x) = tanh(2x + 0.5)
        let d = |x: f32| {
            let t = (2.0 * x as f64 + 0.5).tanh();
            let s = 1.0 - t * t;
            [t, 2.0 * s, 4.0 * (-2.0 * t * s), 8.0 * s * (6.0 * t * t - 2.0)]
        };
        for k in 0..=3 {
            let expected: Vec<f64> = xs.iter().map(|&x| d(x)[k]).collect();
            assert_close(jet.derivative(k), &expected);
        }
    }

    #[test]
    fn product_rule_up_to_third_order() {
        let device = Default::default();
        let xs = [0.1_f32, 0.5, 0.9];
        let x = column::<TestBackend>(&xs, &device);
        // x · x · x = x^3
        let cube = Jet::variable(x.clone(), 3)
            .mul(Jet::variable(x.clone(), 3))
            .mul(Jet::variable(x, 3));
        let expected = |k: usize| -> Vec<f64> {
            xs.iter()
                .map(|&x| {
                    let x = x as f64;
                    [x.powi(3), 3.0 * x * x, 6.0 * x, 6.0][k]
                })
                .collect()
        };
        for k in 0..=3 {
            assert_close(cube.derivative(k), &expected(k));
        }
    }

    #[test]
    fn linear_layer_scales_derivatives_by_weight() {
        let device = Default::default();
        let layer = LinearConfig::new(1, 1).init::<TestBackend>(&device);
        let w = values(layer.weight.val())[0] as f64;
        let xs = [0.2_f32, 0.8];
        let jet = Jet::variable(column::<TestBackend>(&xs, &device), 2).linear(&layer);
        assert_close(jet.derivative(1), &[w, w]);
        assert_close(jet.derivative(2), &[0.0, 0.0]);
    }

    #[test]
    fn order_is_clamped_and_reduced_by_mul() {
        let device = Default::default();
        let x = column::<TestBackend>(&[0.3], &device);
        assert_eq!(Jet::variable(x.clone(), 7).order(), MAX_ORDER);
        let low = Jet::variable(x.clone(), 1).mul(Jet::variable(x, 3));
        assert_eq!(low.order(), 1);
    }

    #[test]
    fn binomial_coefficients() {
        assert_eq!(binomial(3, 0), 1.0);
        assert_eq!(binomial(3, 1), 3.0);
        assert_eq!(binomial(3, 2), 3.0);
        assert_eq!(binomial(2, 1), 2.0);
    }
}
