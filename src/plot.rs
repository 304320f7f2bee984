//! `plotters` による図の出力。
//!
//! 拡張子が `svg` なら `SVGBackend`、それ以外は `BitMapBackend` で描画します。
//! 対数軸は値を `log10` に変換して線形軸に載せます。

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::checkpoint::LossRecord;
use crate::config::NetType;
use crate::stats::Spread;

const SIZE: (u32, u32) = (1000, 600);

/// 1本の系列。
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub markers: bool,
}

impl Series {
    pub fn line(label: impl Into<String>, points: Vec<(f64, f64)>, color: RGBColor) -> Self {
        Self {
            label: label.into(),
            points,
            color,
            markers: false,
        }
    }

    pub fn markers(label: impl Into<String>, points: Vec<(f64, f64)>, color: RGBColor) -> Self {
        Self {
            markers: true,
            ..Self::line(label, points, color)
        }
    }
}

/// 上限と下限で囲まれた帯。
#[derive(Debug, Clone)]
pub struct Band {
    pub upper: Vec<(f64, f64)>,
    pub lower: Vec<(f64, f64)>,
    pub color: RGBColor,
}

/// 1枚の図。
#[derive(Debug, Clone, Default)]
pub struct Figure {
    pub caption: String,
    pub x_desc: String,
    pub y_desc: String,
    pub series: Vec<Series>,
    pub bands: Vec<Band>,
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    (lo - pad, hi + pad)
}

impl Figure {
    pub fn new(caption: &str, x_desc: &str, y_desc: &str) -> Self {
        Self {
            caption: caption.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
            ..Self::default()
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_band(mut self, band: Band) -> Self {
        self.bands.push(band);
        self
    }

    fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.points.iter())
            .chain(self.bands.iter().flat_map(|b| b.upper.iter().chain(&b.lower)))
    }

    /// 図をファイルに書き出します。
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let svg = path.extension().is_some_and(|ext| ext == "svg");
        if svg {
            self.render(SVGBackend::new(path, SIZE).into_drawing_area())?;
        } else {
            self.render(BitMapBackend::new(path, SIZE).into_drawing_area())?;
        }
        Ok(())
    }

    fn render<DB: DrawingBackend>(
        &self,
        root: DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;
        let (x0, x1) = padded_range(self.points().map(|p| p.0));
        let (y0, y1) = padded_range(self.points().map(|p| p.1));
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.caption, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x0..x1, y0..y1)?;
        chart
            .configure_mesh()
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .draw()?;

        for band in &self.bands {
            let mut outline = band.upper.clone();
            outline.extend(band.lower.iter().rev().copied());
            chart.draw_series(std::iter::once(Polygon::new(
                outline,
                band.color.mix(0.3).filled(),
            )))?;
        }
        for series in &self.series {
            let color = series.color;
            let anno = if series.markers {
                chart.draw_series(
                    series
                        .points
                        .iter()
                        .map(|&p| Circle::new(p, 5, color.filled())),
                )?
            } else {
                chart.draw_series(LineSeries::new(
                    series.points.iter().copied(),
                    color.stroke_width(2),
                ))?
            };
            if !series.label.is_empty() {
                anno.label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        root.present()?;
        Ok(())
    }
}

fn log_points(values: impl Iterator<Item = f64>) -> Vec<(f64, f64)> {
    values
        .enumerate()
        .filter(|(_, v)| *v > 0.0)
        .map(|(i, v)| (i as f64, v.log10()))
        .collect()
}

fn xy(x: &[f32], y: &[f32]) -> Vec<(f64, f64)> {
    x.iter().zip(y).map(|(&a, &b)| (a as f64, b as f64)).collect()
}

/// 学習中の損失履歴。
pub fn loss_history(path: &Path, records: &[LossRecord], net_type: NetType) -> anyhow::Result<()> {
    let series = |label: &str, color: RGBColor, f: fn(&LossRecord) -> f32| {
        Series::line(label, log_points(records.iter().map(|r| f(r) as f64)), color)
    };
    let mut figure = Figure::new("Loss History", "Record", "Loss (log10 scale)")
        .with_series(series("dat_loss", BLACK, |r| r.validation))
        .with_series(series("eqs_loss", RED, |r| r.equation))
        .with_series(series("sup_loss", BLUE, |r| r.supervision));
    if net_type.is_gradient_enhanced() {
        figure = figure.with_series(series("grad_loss", GREEN, |r| r.gradient));
    }
    figure.save(path)
}

/// 推定パラメータの履歴と真値。
pub fn parameter_history(path: &Path, par_pred: &[f32], truth: f64) -> anyhow::Result<()> {
    Figure::new("Viscosity Estimate", "Record", "v_e (log10 scale)")
        .with_series(Series::line(
            "v_e_pred",
            log_points(par_pred.iter().map(|&p| p as f64)),
            RED,
        ))
        .with_series(Series::line(
            "EXACT",
            log_points(par_pred.iter().map(|_| truth)),
            BLACK,
        ))
        .save(path)
}

/// 解析解と予測値の比較。`observed` があれば観測点も描きます。
pub fn field_comparison(
    path: &Path,
    x: &[f32],
    exact: &[f32],
    pred: &[f32],
    net_type: NetType,
    observed: Option<(&[f32], &[f32])>,
    y_desc: &str,
) -> anyhow::Result<()> {
    let mut figure = Figure::new(y_desc, "x", y_desc)
        .with_series(Series::line("EXACT", xy(x, exact), BLACK))
        .with_series(Series::line(net_type.as_str(), xy(x, pred), RED));
    if let Some((ox, ou)) = observed {
        figure = figure.with_series(Series::markers("Observed", xy(ox, ou), BLACK));
    }
    figure.save(path)
}

/// ネットワーク種別ごとの色。
pub fn net_color(net_type: NetType) -> RGBColor {
    match net_type {
        NetType::Pinn => BLUE,
        NetType::Gpinn => RED,
    }
}

/// 帯の下端。`mean − half_std` が正でなければ平均の 1/10 で打ち切ります。
fn band_lower(s: &Spread) -> f64 {
    let lower = s.lower();
    if lower > 0.0 { lower } else { s.mean * 0.1 }
}

/// 点数ごとの値を `log10` で並べます。正でない値は描きません。
fn log_curve(counts: &[usize], spreads: &[Spread], f: fn(&Spread) -> f64) -> Vec<(f64, f64)> {
    counts
        .iter()
        .zip(spreads)
        .map(|(&n, s)| (n as f64, f(s)))
        .filter(|(_, v)| *v > 0.0)
        .map(|(n, v)| (n, v.log10()))
        .collect()
}

/// 点数ごとの誤差を平均 ± 帯で描きます。
pub fn error_bands(
    path: &Path,
    counts: &[usize],
    series: &[(NetType, Vec<Spread>)],
    y_desc: &str,
) -> anyhow::Result<()> {
    let mut figure = Figure::new(y_desc, "No. of training points", &format!("{y_desc} (log10)"));
    for (net_type, spreads) in series {
        let color = net_color(*net_type);
        let mean = log_curve(counts, spreads, |s| s.mean);
        figure = figure
            .with_band(Band {
                upper: log_curve(counts, spreads, |s| s.upper()),
                lower: log_curve(counts, spreads, band_lower),
                color,
            })
            .with_series(Series::line(net_type.label(), mean.clone(), color))
            .with_series(Series::markers("", mean, color));
    }
    figure.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_padded_and_handles_degenerate_input() {
        let (lo, hi) = padded_range([1.0, 3.0].into_iter());
        assert!(lo < 1.0 && hi > 3.0);
        assert_eq!(padded_range([2.0].into_iter()), (1.5, 2.5));
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(padded_range([f64::NAN].into_iter()), (0.0, 1.0));
    }

    #[test]
    fn log_points_skip_non_positive_values() {
        let points = log_points([10.0, 0.0, 100.0].into_iter());
        assert_eq!(points, vec![(0.0, 1.0), (2.0, 2.0)]);
    }

    #[test]
    fn wide_spread_keeps_band_on_the_error_scale() {
        let mut errors = vec![0.01; 8];
        errors.push(1.0);
        let spread = Spread::of(&errors).unwrap();
        assert!(spread.lower() < 0.0);

        let lower = log_curve(&[10], &[spread], band_lower);
        assert_eq!(lower.len(), 1);
        assert!((lower[0].1 - (spread.mean * 0.1).log10()).abs() < 1e-12);
        assert!(lower[0].1 > -3.0);
    }

    #[test]
    fn log_curve_drops_zero_errors() {
        let spreads = [
            Spread { mean: 0.0, half_std: 0.0 },
            Spread { mean: 0.1, half_std: 0.0 },
        ];
        let curve = log_curve(&[5, 10], &spreads, |s| s.mean);
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].0, 10.0);
        assert!((curve[0].1 + 1.0).abs() < 1e-12);
    }

    #[test]
    fn figure_collects_band_points() {
        let figure = Figure::new("c", "x", "y").with_band(Band {
            upper: vec![(0.0, 2.0)],
            lower: vec![(0.0, 1.0)],
            color: RED,
        });
        assert_eq!(figure.points().count(), 2);
    }
}
