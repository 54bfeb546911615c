#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 Varian `.xim` 便携图像 (EPID 采集) 的结构化解码/编码,
//! 以及两个二维剂量/像素分布之间的 gamma 一致性分析.
//!
//! 该 crate 目前仅提供 `safe` 接口. 解析外部数据的路径不会 panic,
//! 所有失败都以类型化错误的形式同步返回给调用者.
//!
//! # 注意
//!
//! 1. `.xim` 解码器只针对实际观测到的格式布局 (版本字段不做额外校验).
//! 2. gamma 分析假设两个输入具有可比的空间分辨率, 等形状性由调用者保证
//!    (组件自身只检查维度为 2).
//!
//! # 开发计划
//!
//! ### .xim 头部, 直方图与属性表解析 ✅
//!
//! 实现位于 `epid-berry/src/xim`.
//!
//! ### 压缩像素流重建 (2-bit 查找表 + 变宽差分 + 行预测) ✅
//!
//! 查找表以每字节 4 个 2-bit 选择子的形式给出每个差分值的字节宽度;
//! 差分流按宽度分段成块读取; 行预测子为 `left + above - upper_left`.
//!
//! 实现位于 `epid-berry/src/xim/{lut, diffs, predict}.rs`.
//!
//! ### .xim 编码器 (无损往返) ✅
//!
//! 解码器的精确逆过程, 同时支持压缩与非压缩两种像素体.
//!
//! 实现位于 `epid-berry/src/xim/write.rs`.
//!
//! ### 二维 gamma 一致性分析 ✅
//!
//! 按 D. Low 2004 论文 Table I 的语义实现: 边缘复制填充,
//! 离散圆盘邻域搜索, 全局/局部剂量归一化, 阈值跳过与封顶.
//!
//! 实现位于 `epid-berry/src/gamma`.
//!
//! ### 显示窗口与 PNG 导出 ✅
//!
//! 提供一个独立的显示窗口对象, 以便将像素值转换为 8-bit 灰度值;
//! 解码结果可按原样 (16-bit) 或可视化友好 (窗口化 8-bit) 导出.
//!
//! 实现位于 `epid-berry/src/{window, save}.rs`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

pub mod consts;

mod xim;

pub use xim::{ParseError, PropertyTable, PropertyValue, XimHeader, XimImage};

pub mod gamma;

pub use gamma::{gamma_2d, GammaConfig, GammaError};

#[cfg(feature = "rayon")]
pub use gamma::par_gamma_2d;

mod window;

pub use window::DisplayWindow;

mod save;

pub use save::{ImgWriteRaw, ImgWriteVis};

pub mod prelude;
