//! 像素显示窗口.

use ndarray::ArrayView2;

/// 显示窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// 用于将任意范围的像素值映射为 8-bit 灰度以便可视化.
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct DisplayWindow {
    level: f32,
    width: f32,
}

impl DisplayWindow {
    /// 构建显示窗口.
    ///
    /// `level` 和 `width` 必须在合理范围内, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<DisplayWindow> {
        if (-1e9..=1e9).contains(&level) && 0.0 < width && width <= 1e9 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 覆盖完整 16-bit 无符号像素范围的窗口. 适合多数 EPID 采集.
    #[inline]
    pub const fn from_u16_full() -> DisplayWindow {
        Self {
            level: 32768.0,
            width: 65536.0,
        }
    }

    /// 按网格的实际取值范围拟合窗口. 空网格返回 `None`.
    pub fn fit(data: ArrayView2<'_, i32>) -> Option<DisplayWindow> {
        let lo = *data.iter().min()? as i64;
        let hi = *data.iter().max()? as i64;
        Self::new(((lo + hi) as f32) / 2.0, ((hi - lo).max(1)) as f32)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前窗口设置下, 像素值 `v` 对应的灰度图像素整数值 (0 <= value <= 255)
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        // 截断而非四舍五入: 窗上限以下的值最多映射到 254.
        Some(self.eval_f32(v)? as u8)
    }

    /// 求在当前窗口设置下, 像素值 `v` 对应的灰度图像素分布点 (0.0 <= value <= 255.0).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_f32(&self, v: f32) -> Option<f32> {
        if !v.is_finite() {
            return None;
        }
        let frac = (v - self.lower_bound()) / self.width();
        Some(frac.clamp(0.0, 1.0) * 255.0)
    }
}
