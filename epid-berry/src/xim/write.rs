//! `.xim` 文件的写出.
//!
//! 解码布局的精确逆过程, 用于无损往返与重新容器化.

use super::{diffs, lut, predict, properties, PropertyTable, XimHeader, XimImage};
use crate::consts::xim::{selector_width, FORMAT_VERSION, MAGIC};
use ndarray::Array2;
use std::io::Write;

impl XimImage {
    /// 由像素网格与属性表构建一张可写出的图像.
    ///
    /// 每像素字节数取能容纳全部像素值的最小宽度 (空网格取 2), 直方图留空.
    /// 头部的压缩标志只是占位, 写出时以 [`XimImage::write`] 的参数为准.
    pub fn from_array(array: Array2<i32>, properties: PropertyTable) -> XimImage {
        let (height, width) = array.dim();
        let bytes_per_pixel = array
            .iter()
            .map(|&v| selector_width(diffs::minimal_selector(v)).unwrap_or(4))
            .max()
            .unwrap_or(2) as i32;

        XimImage {
            header: XimHeader {
                format_version: FORMAT_VERSION,
                width,
                height,
                bits_per_pixel: bytes_per_pixel * 8,
                bytes_per_pixel,
                compressed: true,
            },
            array: Some(array),
            histogram: Vec::new(),
            properties,
            uncompressed_buffer_size: None,
        }
    }

    /// 将图像写出为完整的 `.xim` 字节流.
    ///
    /// `compress` 选择像素体布局. 要求像素网格在场;
    /// 解析时跳过了像素体的图像无法写出, 返回 `InvalidInput` 类错误.
    pub fn write<W: Write>(&self, w: &mut W, compress: bool) -> std::io::Result<()> {
        let array = self.array.as_ref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "pixel grid was not decoded")
        })?;
        let (height, width) = array.dim();
        let elem: usize = match self.header.bytes_per_pixel {
            1 => 1,
            2 => 2,
            _ => 4,
        };

        w.write_all(&MAGIC)?;
        for v in [
            self.header.format_version,
            width as i32,
            height as i32,
            self.header.bits_per_pixel,
            elem as i32,
            compress as i32,
        ] {
            w.write_all(&v.to_le_bytes())?;
        }

        if compress {
            let (seed, residuals) = predict::residuals(array);
            let (selectors, payload) = diffs::encode_diffs(&residuals);
            let lut_bytes = lut::pack_selectors(&selectors);

            w.write_all(&(lut_bytes.len() as i32).to_le_bytes())?;
            w.write_all(&lut_bytes)?;
            w.write_all(&((seed.len() * 4 + payload.len()) as i32).to_le_bytes())?;
            for v in &seed {
                w.write_all(&v.to_le_bytes())?;
            }
            w.write_all(&payload)?;
            // 压缩像素体尾随非压缩总字节数.
            w.write_all(&((height * width * 4) as i32).to_le_bytes())?;
        } else {
            w.write_all(&((height * width * elem) as i32).to_le_bytes())?;
            for &v in array.iter() {
                match elem {
                    1 => w.write_all(&[(v as i8) as u8])?,
                    2 => w.write_all(&(v as i16).to_le_bytes())?,
                    _ => w.write_all(&v.to_le_bytes())?,
                }
            }
        }

        w.write_all(&(self.histogram.len() as i32).to_le_bytes())?;
        for v in &self.histogram {
            w.write_all(&v.to_le_bytes())?;
        }
        properties::write_properties(&self.properties, w)
    }
}
