use crate::config::NetType;
use crate::model::Model;
use crate::sampling::TrainingData;
use crate::solution::PhysicalConstants;
use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::{Backend, Tensor};

/// 方程式の残差と、gPINN の場合はその空間微分。
#[derive(Debug, Clone)]
pub struct Residual<B: Backend> {
    pub equation: Tensor<B, 2>,
    pub gradient: Option<Tensor<B, 2>>,
}

/// 物理残差を計算します。
///
/// `-(ν_e / e) u'' + (v / K) u - g` がコロケーション点で 0 になるべき値です。
/// gPINN ではさらにそれを `x` で微分した `-(ν_e / e) u''' + (v / K) u'` も返します。
pub fn residual<B: Backend>(
    model: &Model<B>,
    coords: Tensor<B, 2>,
    constants: &PhysicalConstants,
    net_type: NetType,
) -> Residual<B> {
    let order = if net_type.is_gradient_enhanced() { 3 } else { 2 };
    let jet = model.jet(coords, order);
    let nu = model.viscosity().reshape([1, 1]);
    let diffusion = -1.0 / constants.e;
    let drag = constants.v / constants.k;

    let equation = (jet.derivative(2) * nu.clone()).mul_scalar(diffusion)
        + jet.derivative(0).mul_scalar(drag).sub_scalar(constants.g);
    let gradient = net_type.is_gradient_enhanced().then(|| {
        (jet.derivative(3) * nu).mul_scalar(diffusion) + jet.derivative(1).mul_scalar(drag)
    });
    Residual { equation, gradient }
}

/// 最適化に関わる損失項。
#[derive(Debug, Clone)]
pub struct LossTerms<B: Backend> {
    pub equation: Tensor<B, 1>,
    pub gradient: Tensor<B, 1>,
    pub supervision: Tensor<B, 1>,
    /// 記録のみ。目的関数には含めません。
    pub boundary: Tensor<B, 1>,
}

impl<B: Backend> LossTerms<B> {
    /// 最小化する目的関数 `equation + supervision + g_weight · gradient`。
    pub fn objective(&self, g_weight: f64) -> Tensor<B, 1> {
        self.equation.clone() + self.supervision.clone() + self.gradient.clone().mul_scalar(g_weight)
    }
}

fn mean_square<B: Backend>(residual: Tensor<B, 2>) -> Tensor<B, 1> {
    let target = residual.zeros_like();
    MseLoss::new().forward(residual, target, Reduction::Mean)
}

/// 各損失項を計算します。
pub fn loss_terms<B: Backend>(
    model: &Model<B>,
    data: &TrainingData<B>,
    constants: &PhysicalConstants,
    net_type: NetType,
) -> LossTerms<B> {
    let residual = residual(model, data.eqs_x.clone(), constants, net_type);
    let equation = mean_square(residual.equation);
    let gradient = match residual.gradient {
        Some(g) => mean_square(g),
        None => equation.zeros_like(),
    };
    let supervision = MseLoss::new().forward(
        model.predict(data.sup_x.clone()),
        data.sup_u.clone(),
        Reduction::Mean,
    );
    let boundary = MseLoss::new().forward(
        model.predict(data.bcs_x.clone()),
        data.bcs_u.clone(),
        Reduction::Mean,
    );
    LossTerms {
        equation,
        gradient,
        supervision,
        boundary,
    }
}

/// 検証格子上の平均二乗誤差。診断用です。
pub fn validation_loss<B: Backend>(model: &Model<B>, data: &TrainingData<B>) -> Tensor<B, 1> {
    MseLoss::new().forward(
        model.predict(data.val_x.clone()),
        data.val_u.clone(),
        Reduction::Mean,
    )
}
