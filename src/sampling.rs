//! 学習・検証に用いるサンプル点の生成。
//!
//! すべて等間隔の決定的な点列です。同じ点数を与えれば常に同じ座標が得られます。

use crate::error::PinnError;
use crate::solution::ReferenceSolution;
use burn::prelude::{Backend, Tensor};

/// 座標と解析解の組。
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub x: Vec<f32>,
    pub u: Vec<f32>,
    pub du: Vec<f32>,
}

impl SampleSet {
    fn from_coords(coords: Vec<f64>, solution: &ReferenceSolution) -> Self {
        Self {
            u: coords.iter().map(|&x| solution.value(x) as f32).collect(),
            du: coords.iter().map(|&x| solution.gradient(x) as f32).collect(),
            x: coords.into_iter().map(|x| x as f32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// 領域内部の監督点を生成します。
///
/// `i = 0..n` に対して `x_i = (i + 1) / (n + 1) · H` となり、両端点は含みません。
pub fn supervised(n: usize, solution: &ReferenceSolution) -> Result<SampleSet, PinnError> {
    if n < 1 {
        return Err(PinnError::InvalidSampleCount {
            name: "nx_sup",
            min: 1,
            got: n,
        });
    }
    let h = solution.constants.h;
    let coords = (0..n)
        .map(|i| (i + 1) as f64 / (n + 1) as f64 * h)
        .collect();
    Ok(SampleSet::from_coords(coords, solution))
}

/// 両端点を含めて `[0, H]` を `n` 等分した点列を生成します。
pub fn uniform(
    n: usize,
    name: &'static str,
    solution: &ReferenceSolution,
) -> Result<SampleSet, PinnError> {
    if n < 2 {
        return Err(PinnError::InvalidSampleCount { name, min: 2, got: n });
    }
    let h = solution.constants.h;
    let coords = (0..n)
        .map(|i| {
            if i == n - 1 {
                h
            } else {
                i as f64 * h / (n - 1) as f64
            }
        })
        .collect();
    Ok(SampleSet::from_coords(coords, solution))
}

/// 1回の学習で使用するサンプル一式。
#[derive(Debug, Clone)]
pub struct Samples {
    pub equation: SampleSet,
    pub boundary: SampleSet,
    pub supervised: SampleSet,
    pub validation: SampleSet,
}

impl Samples {
    pub fn generate(
        nx_eqs: usize,
        nx_sup: usize,
        nx_val: usize,
        solution: &ReferenceSolution,
    ) -> Result<Self, PinnError> {
        let equation = uniform(nx_eqs, "nx_eqs", solution)?;
        let last = equation.len() - 1;
        let boundary = SampleSet {
            x: vec![equation.x[0], equation.x[last]],
            u: vec![equation.u[0], equation.u[last]],
            du: vec![equation.du[0], equation.du[last]],
        };
        Ok(Self {
            boundary,
            supervised: supervised(nx_sup, solution)?,
            validation: uniform(nx_val, "nx_val", solution)?,
            equation,
        })
    }
}

/// 値の列を `[n, 1]` の列ベクトルテンソルに変換します。
pub fn column<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(values, device).reshape([values.len(), 1])
}

/// `[n, 1]` テンソルの値を取り出します。
pub fn values<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>, PinnError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| PinnError::TensorData(format!("{e:?}")))
}

/// 学習ループで毎回使用するテンソル群。
#[derive(Debug, Clone)]
pub struct TrainingData<B: Backend> {
    pub eqs_x: Tensor<B, 2>,
    pub bcs_x: Tensor<B, 2>,
    pub bcs_u: Tensor<B, 2>,
    pub sup_x: Tensor<B, 2>,
    pub sup_u: Tensor<B, 2>,
    pub val_x: Tensor<B, 2>,
    pub val_u: Tensor<B, 2>,
}

impl<B: Backend> TrainingData<B> {
    pub fn new(samples: &Samples, device: &B::Device) -> Self {
        Self {
            eqs_x: column(&samples.equation.x, device),
            bcs_x: column(&samples.boundary.x, device),
            bcs_u: column(&samples.boundary.u, device),
            sup_x: column(&samples.supervised.x, device),
            sup_u: column(&samples.supervised.u, device),
            val_x: column(&samples.validation.x, device),
            val_u: column(&samples.validation.u, device),
        }
    }
}
