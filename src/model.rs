use crate::jet::Jet;
use burn::module::{Ignored, Module, Param};
use burn::nn::{Initializer, Linear, LinearConfig, Tanh};
use burn::prelude::{Backend, Config};
use burn::tensor::Tensor;

/// 推定パラメータに掛かるスケール
pub const VISCOSITY_SCALE: f64 = 0.1;

/// ネットワークの構成。
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 隠れ層の幅
    #[config(default = 20)]
    pub hidden_width: usize,
    /// 隠れ層の数
    #[config(default = 3)]
    pub hidden_layers: usize,
    /// 境界条件を課す領域 `[0, H]` の長さ
    #[config(default = 1.0)]
    pub domain_length: f64,
}

impl ModelConfig {
    /// 新しいモデルを初期化します。推定パラメータの生値は 0 から始まります。
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let width = self.hidden_width;
        let layer = |d_in: usize, d_out: usize| {
            LinearConfig::new(d_in, d_out)
                .with_initializer(Initializer::XavierNormal { gain: 1.0 })
                .init::<B>(device)
        };
        let mut linears: Vec<Linear<B>> = Vec::with_capacity(self.hidden_layers + 1);
        linears.push(layer(1, width));
        for _ in 1..self.hidden_layers {
            linears.push(layer(width, width));
        }
        linears.push(layer(width, 1));
        Model {
            linears,
            activation: Tanh::new(),
            viscosity_raw: Param::from_tensor(Tensor::zeros([1], device)),
            domain_length: Ignored(self.domain_length),
        }
    }
}

/// PINNの本体となるニューラルネットワークモデル。
///
/// 座標 `x` を入力とし、その点における流速 `u` を予測する多層パーセプトロン（MLP）に、
/// 有効粘性を表す学習可能なスカラーを 1 つ加えたものです。
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    linears: Vec<Linear<B>>,
    activation: Tanh,
    viscosity_raw: Param<Tensor<B, 1>>,
    domain_length: Ignored<f64>,
}

impl<B: Backend> Model<B> {
    /// 変換前のネットワーク出力。
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.linears.len() - 1;
        let mut x = input;
        for (i, linear) in self.linears.iter().enumerate() {
            x = linear.forward(x);
            if i < last {
                x = self.activation.forward(x);
            }
        }
        x
    }

    /// `tanh(x) · tanh(H - x)` を掛けて両端で 0 となるようにします。
    pub fn out_transform(&self, x: Tensor<B, 2>, out: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = self.domain_length.0;
        let left = x.clone().tanh();
        let right = x.neg().add_scalar(h).tanh();
        left * right * out
    }

    /// 境界条件を満たした流速の予測値。
    pub fn predict(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let out = self.forward(x.clone());
        self.out_transform(x, out)
    }

    /// 変換後の出力と、その `x` に関する `order` 階までの微分。
    pub fn jet(&self, x: Tensor<B, 2>, order: usize) -> Jet<B> {
        let h = self.domain_length.0;
        let last = self.linears.len() - 1;
        let mut net = Jet::variable(x.clone(), order);
        for (i, linear) in self.linears.iter().enumerate() {
            net = net.linear(linear);
            if i < last {
                net = net.tanh();
            }
        }
        let left = Jet::variable(x.clone(), order).tanh();
        let right = Jet::variable(x, order).affine(-1.0, h).tanh();
        left.mul(right).mul(net)
    }

    /// 有効粘性 `ν_e = 0.1 · ln(1 + exp(ν_raw))`。常に正の値です。
    pub fn viscosity(&self) -> Tensor<B, 1> {
        self.viscosity_raw
            .val()
            .exp()
            .add_scalar(1.0)
            .log()
            .mul_scalar(VISCOSITY_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::column;
    use burn::backend::NdArray;
    use burn::tensor::{ElementConversion, TensorData};

    type TestBackend = NdArray<f32>;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn transform_vanishes_at_walls() {
        let device = Default::default();
        let model = ModelConfig::new().init::<TestBackend>(&device);
        let walls = column::<TestBackend>(&[0.0, 1.0], &device);
        let raw = Tensor::<TestBackend, 2>::from_floats([[123.0], [-45.0]], &device);
        assert_eq!(values(model.out_transform(walls.clone(), raw)), vec![0.0, 0.0]);
        assert_eq!(values(model.predict(walls)), vec![0.0, 0.0]);
    }

    #[test]
    fn transform_respects_domain_length() {
        let device = Default::default();
        let model = ModelConfig::new()
            .with_domain_length(2.0)
            .init::<TestBackend>(&device);
        let walls = column::<TestBackend>(&[0.0, 2.0], &device);
        assert_eq!(values(model.predict(walls)), vec![0.0, 0.0]);
    }

    #[test]
    fn jet_value_matches_prediction() {
        let device = Default::default();
        let model = ModelConfig::new().init::<TestBackend>(&device);
        let x = column::<TestBackend>(&[0.0, 0.2, 0.5, 0.77, 1.0], &device);
        let jet = model.jet(x.clone(), 3);
        for (a, b) in values(jet.value()).iter().zip(values(model.predict(x))) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn jet_first_derivative_matches_finite_difference() {
        let device = Default::default();
        let model = ModelConfig::new().init::<TestBackend>(&device);
        let xs = [0.1_f32, 0.4, 0.9];
        let step = 1e-2_f32;
        let plus: Vec<f32> = xs.iter().map(|x| x + step).collect();
        let minus: Vec<f32> = xs.iter().map(|x| x - step).collect();
        let up = values(model.predict(column(&plus, &device)));
        let down = values(model.predict(column(&minus, &device)));
        let d1 = values(model.jet(column(&xs, &device), 1).derivative(1));
        for i in 0..xs.len() {
            let fd = (up[i] - down[i]) / (2.0 * step);
            assert!((fd - d1[i]).abs() < 1e-2, "{fd} vs {}", d1[i]);
        }
    }

    #[test]
    fn jet_higher_derivatives_match_finite_differences() {
        type Precise = NdArray<f64>;
        let device = Default::default();
        let model = ModelConfig::new().init::<Precise>(&device);
        let point = |x: f64| {
            Tensor::<Precise, 2>::from_data(TensorData::new(vec![x], [1, 1]), &device)
        };
        let f = |x: f64| model.predict(point(x)).into_scalar().elem::<f64>();
        let at = |x: f64, k: usize| {
            model
                .jet(point(x), 3)
                .derivative(k)
                .into_scalar()
                .elem::<f64>()
        };
        for x in [0.1, 0.37, 0.8] {
            let h2 = 1e-4;
            let fd2 = (f(x + h2) - 2.0 * f(x) + f(x - h2)) / (h2 * h2);
            let h3 = 1e-3;
            let fd3 = (f(x + 2.0 * h3) - 2.0 * f(x + h3) + 2.0 * f(x - h3) - f(x - 2.0 * h3))
                / (2.0 * h3 * h3 * h3);
            let (d2, d3) = (at(x, 2), at(x, 3));
            assert!((fd2 - d2).abs() < 1e-4 * d2.abs().max(1.0), "{fd2} vs {d2}");
            assert!((fd3 - d3).abs() < 1e-3 * d3.abs().max(1.0), "{fd3} vs {d3}");
        }
    }

    #[test]
    fn viscosity_starts_at_scaled_softplus_of_zero() {
        let device = Default::default();
        let model = ModelConfig::new().init::<TestBackend>(&device);
        let nu = model.viscosity().into_scalar().elem::<f64>();
        assert!((nu - 0.1 * 2f64.ln()).abs() < 1e-6);
        assert!(nu > 0.0);
    }
}
