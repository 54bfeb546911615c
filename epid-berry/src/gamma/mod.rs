//! 二维 gamma 剂量一致性分析.
//!
//! 按 D. Low 2004 年论文 Table I 的语义逐元素计算参考分布与评估分布之间的
//! gamma 值: 在参考点周围的离散圆盘邻域内搜索, 对每个候选点求归一化剂量差
//! 与归一化空间距离的平方和的开方, 取最小者并封顶.
//!
//! 组件不做尺寸/空间分辨率的等同性检查, 等形状与等分辨率由调用者保证;
//! 组件自身只校验两个输入的维度都为 2.

use crate::Idx2d;
use ndarray::{Array2, ArrayView2, ArrayViewD, Ix2};
use ordered_float::OrderedFloat;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Zip;
    }
}

/// gamma 分析配置.
///
/// 该结构完全透明. [`GammaConfig::default`] 给出常用缺省值:
/// 1% 剂量容差, 1 元素距离容差, 2.0 封顶, 全局归一化, 5% 剂量阈值, NaN 填充.
#[derive(Copy, Clone, Debug)]
pub struct GammaConfig {
    /// 剂量容差, 以参考分布全局最大值 (全局归一化) 或参考点局部值
    /// (局部归一化) 的百分比表示. 必须是正的有限值.
    pub dose_to_agreement: f64,

    /// 距离容差, 以网格元素数表示. 必须大于 0.
    pub distance_to_agreement: usize,

    /// gamma 封顶值. 例如封顶 2.0 时, 算得的 5.3 记为 2.0.
    pub gamma_cap_value: f64,

    /// `true` 用全局最大值归一化剂量差, `false` 用被评估参考点的局部值.
    pub global_dose: bool,

    /// 剂量阈值, 参考分布全局最大值的百分比. 低于阈值的参考点不评估.
    /// 该阈值不受归一化方式影响, 始终相对全局最大值.
    pub dose_threshold: f64,

    /// 未评估元素填入的值. 缺省为 NaN, 下游统计可以用 NaN
    /// 感知的归约自动排除未评估点, 而不会被本应忽略的 0 拉偏.
    pub fill_value: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            dose_to_agreement: 1.0,
            distance_to_agreement: 1,
            gamma_cap_value: 2.0,
            global_dose: true,
            dose_threshold: 5.0,
            fill_value: f64::NAN,
        }
    }
}

/// gamma 分析错误. 全部在任何逐元素计算开始之前同步返回.
#[derive(Debug, Clone, PartialEq)]
pub enum GammaError {
    /// 输入维度不为 2.
    InvalidDimensionality {
        /// 参考分布的维度.
        reference: usize,
        /// 评估分布的维度.
        evaluation: usize,
    },

    /// 距离容差为 0.
    NonPositiveDistance,

    /// 剂量容差不是正的有限值.
    BadDoseToAgreement(f64),
}

impl GammaConfig {
    /// 前置条件检查.
    fn check(&self) -> Result<(), GammaError> {
        if self.distance_to_agreement == 0 {
            return Err(GammaError::NonPositiveDistance);
        }
        if !(self.dose_to_agreement.is_finite() && self.dose_to_agreement > 0.0) {
            return Err(GammaError::BadDoseToAgreement(self.dose_to_agreement));
        }
        Ok(())
    }
}

/// 计算 `reference` 与 `evaluation` 之间的 gamma 映射.
///
/// 返回的网格与 `reference` 形状一致: 每个元素要么是算得的 gamma 值
/// (非负, 封顶后), 要么是低于剂量阈值时的填充值.
///
/// # 返回值
///
/// - 任一输入维度不为 2 时, 返回 `Err(GammaError::InvalidDimensionality)`;
/// - 配置不满足前置条件时, 返回对应的 `Err`;
/// - 其他情况下成功. 两个输入形状不一致时结果未定义 (可能 panic).
pub fn gamma_2d(
    reference: ArrayViewD<'_, f64>,
    evaluation: ArrayViewD<'_, f64>,
    cfg: &GammaConfig,
) -> Result<Array2<f64>, GammaError> {
    let (reference, evaluation) = as_2d(reference, evaluation)?;
    cfg.check()?;

    if reference.is_empty() || evaluation.is_empty() {
        return Ok(Array2::from_elem(reference.raw_dim(), cfg.fill_value));
    }
    let scan = Scan::new(reference, evaluation, cfg);
    let mut gamma = Array2::zeros(reference.raw_dim());
    for (pos, &ref_point) in reference.indexed_iter() {
        gamma[pos] = scan.cell(pos, ref_point);
    }
    Ok(gamma)
}

/// [`gamma_2d`] 的数据并行版本.
///
/// 每个参考元素的计算相互独立, 填充后的评估网格在扫描期间只读,
/// 因此外层元素循环借助 `rayon` 并行, 语义与串行版本完全一致.
#[cfg(feature = "rayon")]
pub fn par_gamma_2d(
    reference: ArrayViewD<'_, f64>,
    evaluation: ArrayViewD<'_, f64>,
    cfg: &GammaConfig,
) -> Result<Array2<f64>, GammaError> {
    let (reference, evaluation) = as_2d(reference, evaluation)?;
    cfg.check()?;

    if reference.is_empty() || evaluation.is_empty() {
        return Ok(Array2::from_elem(reference.raw_dim(), cfg.fill_value));
    }
    let scan = Scan::new(reference, evaluation, cfg);
    let mut gamma = Array2::zeros(reference.raw_dim());
    Zip::indexed(&mut gamma)
        .and(reference)
        .par_for_each(|pos, g, &ref_point| {
            *g = scan.cell(pos, ref_point);
        });
    Ok(gamma)
}

/// 维度校验, 通过后降到静态二维视图.
fn as_2d<'a>(
    reference: ArrayViewD<'a, f64>,
    evaluation: ArrayViewD<'a, f64>,
) -> Result<(ArrayView2<'a, f64>, ArrayView2<'a, f64>), GammaError> {
    if reference.ndim() != 2 || evaluation.ndim() != 2 {
        return Err(GammaError::InvalidDimensionality {
            reference: reference.ndim(),
            evaluation: evaluation.ndim(),
        });
    }
    // 维度已校验, 转换不会失败.
    Ok((
        reference.into_dimensionality::<Ix2>().unwrap(),
        evaluation.into_dimensionality::<Ix2>().unwrap(),
    ))
}

/// 单次 gamma 扫描的只读上下文.
struct Scan<'a> {
    cfg: &'a GammaConfig,
    /// 边缘复制填充后的评估网格.
    padded: Array2<f64>,
    /// 圆盘邻域偏移及其欧氏距离.
    offsets: Vec<(isize, isize, f64)>,
    threshold: f64,
    global_dose_ta: f64,
}

impl<'a> Scan<'a> {
    fn new(reference: ArrayView2<f64>, evaluation: ArrayView2<f64>, cfg: &'a GammaConfig) -> Self {
        // NaN 不参与最大值归约.
        let global_max = reference.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        Self {
            cfg,
            padded: pad_edge(evaluation, cfg.distance_to_agreement),
            offsets: disk_offsets(cfg.distance_to_agreement),
            threshold: global_max / 100.0 * cfg.dose_threshold,
            global_dose_ta: cfg.dose_to_agreement / 100.0 * global_max,
        }
    }

    /// 参考点 `pos` 处的 gamma 值.
    fn cell(&self, pos: Idx2d, ref_point: f64) -> f64 {
        if ref_point < self.threshold {
            return self.cfg.fill_value;
        }
        let dose_ta = if self.cfg.global_dose {
            self.global_dose_ta
        } else {
            self.cfg.dose_to_agreement / 100.0 * ref_point
        };
        let dta = self.cfg.distance_to_agreement;
        // 参考点在填充坐标系中的位置.
        let (center_r, center_c) = (pos.0 + dta, pos.1 + dta);

        let best = self
            .offsets
            .iter()
            .map(|&(dy, dx, dist)| {
                let er = (center_r as isize + dy) as usize;
                let ec = (center_c as isize + dx) as usize;
                let dose = self.padded[(er, ec)] - ref_point;
                let dta = dta as f64;
                (dist * dist / (dta * dta) + dose * dose / (dose_ta * dose_ta)).sqrt()
            })
            .map(OrderedFloat)
            .min()
            .map_or(f64::NAN, |m| m.0);

        // OrderedFloat 把 NaN 排在最大, 因此只有全部候选都是 NaN 时
        // 最小值才是 NaN; 此时不封顶, 保持 NaN 传播.
        if best.is_nan() {
            best
        } else {
            best.min(self.cfg.gamma_cap_value)
        }
    }
}

/// 圆盘邻域的偏移集合与各自的欧氏距离.
///
/// 搜索半径为 `dta + 1` 且不含边界圆周 (圆盘成员判定为严格小于),
/// 因此偏移分量的绝对值不超过 `dta`, 恰好落在填充宽度内.
fn disk_offsets(dta: usize) -> Vec<(isize, isize, f64)> {
    let r = dta as isize;
    let r2 = ((dta + 1) * (dta + 1)) as isize;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dy * dy + dx * dx;
            if d2 < r2 {
                offsets.push((dy, dx, (d2 as f64).sqrt()));
            }
        }
    }
    offsets
}

/// 以边缘复制方式在四周填充 `margin` 个元素.
fn pad_edge(a: ArrayView2<f64>, margin: usize) -> Array2<f64> {
    let (h, w) = a.dim();
    Array2::from_shape_fn((h + 2 * margin, w + 2 * margin), |(i, j)| {
        a[(
            i.saturating_sub(margin).min(h - 1),
            j.saturating_sub(margin).min(w - 1),
        )]
    })
}
