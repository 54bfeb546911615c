//! 图像的持久化存储.

use crate::window::DisplayWindow;
use image::ImageResult;
use ndarray::Array2;
use std::path::Path;

/// 表明一个可以按 **原样** 模式持久化存储的图像对象.
///
/// `ImgWriteRaw` trait 的意图是, 像素值不做任何规范化, 仅钳制到
/// 16-bit 无符号范围后写为 16-bit 灰度图 (建议 PNG).
pub trait ImgWriteRaw {
    /// 按原样将图像保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 表明一个可以按 **可视化友好** 模式持久化存储的图像对象.
///
/// `ImgWriteVis` trait 的意图是, 像素值先经显示窗口映射为 8-bit
/// 灰度再存储, 而不是 "as is" 的方式; 这样高动态范围的采集在普通
/// 看图工具里也有可辨认的对比度.
pub trait ImgWriteVis {
    /// 经显示窗口 `window` 规范化后将图像保存到 `path` 路径.
    fn save_vis<P: AsRef<Path>>(&self, path: P, window: DisplayWindow) -> ImageResult<()>;
}

impl ImgWriteRaw for Array2<i32> {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.dim();
        let mut buf =
            image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            let v = num::clamp(pix, 0, u16::MAX as i32) as u16;
            buf.put_pixel(w as u32, h as u32, image::Luma([v]));
        }
        buf.save(path)
    }
}

impl ImgWriteVis for Array2<i32> {
    fn save_vis<P: AsRef<Path>>(&self, path: P, window: DisplayWindow) -> ImageResult<()> {
        let (height, width) = self.dim();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            let v = window.eval(pix as f32).unwrap_or(u8::MIN);
            buf.put_pixel(w as u32, h as u32, image::Luma([v]));
        }
        buf.save(path)
    }
}
