//! Varian `.xim` 便携图像的解码与编码.
//!
//! 文件布局 (全部小端): 8 字节魔数, 格式版本, 宽, 高, 每像素 bit 数,
//! 每像素字节数, 压缩标志; 之后是像素体 (压缩或非压缩), 直方图与属性表.
//! 压缩像素体由三部分组成: 2-bit 选择子查找表, 非压缩的首行 (加第二行首元素),
//! 以及变宽差分流. 解码端对输入流只做单向顺序读取, 不回溯.

use ndarray::Array2;
use num::ToPrimitive;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::consts::xim::MAGIC;
use crate::Idx2d;

mod diffs;
mod lut;
mod predict;
mod properties;
mod reader;
mod write;

pub use properties::{PropertyTable, PropertyValue};

/// `.xim` 解析错误.
///
/// 解析没有部分成功模式: 文件要么完整解析, 要么整体失败.
#[derive(Debug)]
pub enum ParseError {
    /// 魔数不匹配. 携带实际读到的 8 字节.
    InvalidFormat([u8; 8]),

    /// 流在期望的字节数到达之前耗尽.
    TruncatedStream,

    /// 其他底层 I/O 错误.
    Io(std::io::Error),

    /// 属性表中出现未知的类型标签.
    UnknownPropertyType(i32),

    /// 查找表中出现不对应任何字节宽度的选择子 (只有 0/1/2 合法).
    BadWidthSelector(u8),

    /// 查找表长度不足以覆盖全部差分值.
    LookupTableTooShort {
        /// 查找表实际提供的选择子个数.
        have: usize,
        /// 重建像素需要的差分值个数.
        need: usize,
    },

    /// 头部给出的图像尺寸为负.
    BadDimensions {
        /// 头部的宽度字段.
        width: i32,
        /// 头部的高度字段.
        height: i32,
    },

    /// 头部给出的长度前缀为负.
    NegativeLength(i32),

    /// 非压缩像素体的字节数与头部尺寸不一致.
    BadPixelBuffer {
        /// 按头部尺寸计算的期望字节数.
        expected: usize,
        /// 文件实际给出的字节数.
        got: usize,
    },

    /// 头部的每像素字节数不在 {1, 2, 4} 内.
    BadPixelWidth(i32),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ParseError::TruncatedStream,
            _ => ParseError::Io(e),
        }
    }
}

/// `.xim` 固定头部.
///
/// 该结构完全透明. 字段与文件中的出现顺序一致.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct XimHeader {
    /// 格式版本. 解码端不校验.
    pub format_version: i32,
    /// 图像宽度 (像素).
    pub width: usize,
    /// 图像高度 (像素).
    pub height: usize,
    /// 每像素 bit 数.
    pub bits_per_pixel: i32,
    /// 每像素字节数. 决定非压缩像素体的元素宽度.
    pub bytes_per_pixel: i32,
    /// 像素体是否压缩.
    pub compressed: bool,
}

/// 一张解码后的 `.xim` 图像.
///
/// 像素网格统一放大到 `i32` 存储 (原始文件中元素可能只有 1/2 字节宽).
#[derive(Debug, Clone)]
pub struct XimImage {
    header: XimHeader,
    array: Option<Array2<i32>>,
    histogram: Vec<i32>,
    properties: PropertyTable,
    uncompressed_buffer_size: Option<i32>,
}

impl XimImage {
    /// 从字节流解析一张 `.xim` 图像.
    ///
    /// `decode_pixels` 为 `false` 时跳过像素体 (按字节数快进),
    /// 只解析头部, 直方图与属性表; 此时 [`XimImage::array`] 返回 `None`.
    /// 该模式用于只按属性筛选图像的快速扫描场景.
    pub fn parse<R: Read>(r: &mut R, decode_pixels: bool) -> Result<Self, ParseError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(ParseError::InvalidFormat(magic));
        }

        let format_version = reader::read_i32(r)?;
        let raw_width = reader::read_i32(r)?;
        let raw_height = reader::read_i32(r)?;
        let bits_per_pixel = reader::read_i32(r)?;
        let bytes_per_pixel = reader::read_i32(r)?;
        let compressed = reader::read_i32(r)? != 0;

        if raw_width < 0 || raw_height < 0 {
            return Err(ParseError::BadDimensions {
                width: raw_width,
                height: raw_height,
            });
        }
        let width = raw_width as usize;
        let height = raw_height as usize;
        let total = width * height;

        let mut array = None;
        let mut uncompressed_buffer_size = None;

        if !compressed {
            let buf_size = reader::read_len(r)?;
            if decode_pixels {
                let buf = reader::read_exact_vec(r, buf_size)?;
                array = Some(decode_raw_buffer(&buf, height, width, bytes_per_pixel)?);
            } else {
                reader::skip(r, buf_size)?;
            }
        } else {
            let lut_size = reader::read_len(r)?;
            let lut = reader::read_exact_vec(r, lut_size)?;
            let comp_size = reader::read_len(r)?;
            if decode_pixels {
                let selectors = lut::unpack_selectors(&lut);
                let seed_len = (width + 1).min(total);
                let seed = reader::read_i32_vec(r, seed_len)?;
                let n_diffs = total.saturating_sub(width + 1);
                let diffs = diffs::read_diffs(&selectors, n_diffs, r)?;
                array = Some(predict::reconstruct(height, width, &seed, &diffs));
            } else {
                reader::skip(r, comp_size)?;
            }
            // 压缩像素体之后还跟着一个 4 字节的非压缩总字节数.
            uncompressed_buffer_size = Some(reader::read_i32(r)?);
        }

        let num_hist_bins = reader::read_len(r)?;
        let histogram = reader::read_i32_vec(r, num_hist_bins)?;
        let properties = properties::read_properties(r)?;

        Ok(Self {
            header: XimHeader {
                format_version,
                width,
                height,
                bits_per_pixel,
                bytes_per_pixel,
                compressed,
            },
            array,
            histogram,
            properties,
            uncompressed_buffer_size,
        })
    }

    /// 打开并解析路径 `p` 处的 `.xim` 文件.
    pub fn open<P: AsRef<Path>>(p: P, decode_pixels: bool) -> Result<Self, ParseError> {
        let mut r = BufReader::new(File::open(p).map_err(ParseError::Io)?);
        Self::parse(&mut r, decode_pixels)
    }

    /// 文件头部.
    #[inline]
    pub fn header(&self) -> &XimHeader {
        &self.header
    }

    /// 图像尺寸, `(高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        (self.header.height, self.header.width)
    }

    /// 解码后的像素网格. 解析时跳过了像素体则返回 `None`.
    #[inline]
    pub fn array(&self) -> Option<&Array2<i32>> {
        self.array.as_ref()
    }

    /// 取出像素网格的所有权.
    #[inline]
    pub fn into_array(self) -> Option<Array2<i32>> {
        self.array
    }

    /// 像素网格的 `f64` 副本, 供 gamma 分析等浮点计算使用.
    pub fn to_f64(&self) -> Option<Array2<f64>> {
        self.array
            .as_ref()
            .map(|a| a.mapv(|v| v.to_f64().unwrap_or(f64::NAN)))
    }

    /// 文件中携带的直方图.
    #[inline]
    pub fn histogram(&self) -> &[i32] {
        &self.histogram
    }

    /// 属性表.
    #[inline]
    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    /// 压缩像素体尾部记录的非压缩总字节数. 非压缩文件没有该字段.
    #[inline]
    pub fn uncompressed_buffer_size(&self) -> Option<i32> {
        self.uncompressed_buffer_size
    }
}

/// 按 `bytes_per_pixel` 宽度将非压缩像素体解释为小端有符号整数网格.
fn decode_raw_buffer(
    buf: &[u8],
    height: usize,
    width: usize,
    bytes_per_pixel: i32,
) -> Result<Array2<i32>, ParseError> {
    let elem = match bytes_per_pixel {
        1 | 2 | 4 => bytes_per_pixel as usize,
        other => return Err(ParseError::BadPixelWidth(other)),
    };
    let expected = height * width * elem;
    if buf.len() != expected {
        return Err(ParseError::BadPixelBuffer {
            expected,
            got: buf.len(),
        });
    }

    let flat: Vec<i32> = match elem {
        1 => buf.iter().map(|&b| b as i8 as i32).collect(),
        2 => buf
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as i32)
            .collect(),
        _ => buf
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    };
    // 长度在上面已对齐, 这里不会失败.
    Ok(Array2::from_shape_vec((height, width), flat).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Cursor;

    fn sample_array() -> Array2<i32> {
        array![
            [10, 12, 11, 300, -4],
            [9, 13, 14, 280, -2],
            [8, 70000, 15, 260, 0],
        ]
    }

    fn sample_properties() -> PropertyTable {
        let mut t = PropertyTable::default();
        t.insert("AcquisitionMode".into(), PropertyValue::String("IDU".into()));
        t.insert("GantryRtn".into(), PropertyValue::Double(179.5));
        t.insert("KVCollimatorX".into(), PropertyValue::Int(-7));
        t
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = vec![0u8; 64];
        bytes[..8].copy_from_slice(b"NOTXIM!!");
        let err = XimImage::parse(&mut Cursor::new(bytes), true).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_truncated_header() {
        let bytes = MAGIC.to_vec();
        let err = XimImage::parse(&mut Cursor::new(bytes), true).unwrap_err();
        assert!(matches!(err, ParseError::TruncatedStream));
    }

    #[test]
    fn test_compressed_roundtrip() {
        let src = XimImage::from_array(sample_array(), sample_properties());
        let mut bytes = Vec::new();
        src.write(&mut bytes, true).unwrap();

        let img = XimImage::parse(&mut Cursor::new(&bytes), true).unwrap();
        assert!(img.header().compressed);
        assert_eq!(img.shape(), (3, 5));
        assert_eq!(img.array().unwrap(), &sample_array());
        assert_eq!(
            img.properties().get("GantryRtn"),
            Some(&PropertyValue::Double(179.5))
        );
    }

    #[test]
    fn test_uncompressed_roundtrip() {
        let src = XimImage::from_array(sample_array(), sample_properties());
        let mut bytes = Vec::new();
        src.write(&mut bytes, false).unwrap();

        let img = XimImage::parse(&mut Cursor::new(&bytes), true).unwrap();
        assert!(!img.header().compressed);
        assert_eq!(img.array().unwrap(), &sample_array());
    }

    // 压缩与非压缩两种编码对同一网格必须解码出相同结果.
    #[test]
    fn test_compressed_equals_uncompressed() {
        let src = XimImage::from_array(sample_array(), PropertyTable::default());
        let (mut comp, mut raw) = (Vec::new(), Vec::new());
        src.write(&mut comp, true).unwrap();
        src.write(&mut raw, false).unwrap();

        let a = XimImage::parse(&mut Cursor::new(&comp), true).unwrap();
        let b = XimImage::parse(&mut Cursor::new(&raw), true).unwrap();
        assert_eq!(a.array().unwrap(), b.array().unwrap());
    }

    #[test]
    fn test_metadata_only_scan_keeps_alignment() {
        let src = XimImage::from_array(sample_array(), sample_properties());
        let mut bytes = Vec::new();
        src.write(&mut bytes, true).unwrap();

        // 跳过像素体后, 直方图与属性表仍然必须对齐解析.
        let img = XimImage::parse(&mut Cursor::new(&bytes), false).unwrap();
        assert!(img.array().is_none());
        assert_eq!(img.properties().len(), 3);
        assert_eq!(
            img.properties().get("KVCollimatorX"),
            Some(&PropertyValue::Int(-7))
        );
        assert!(img.uncompressed_buffer_size().is_some());
    }

    #[test]
    fn test_metadata_only_scan_uncompressed() {
        let src = XimImage::from_array(sample_array(), sample_properties());
        let mut bytes = Vec::new();
        src.write(&mut bytes, false).unwrap();

        let img = XimImage::parse(&mut Cursor::new(&bytes), false).unwrap();
        assert!(img.array().is_none());
        assert_eq!(img.properties().len(), 3);
        assert_eq!(img.uncompressed_buffer_size(), None);
    }

    // 高 x 宽 <= 宽 + 1 的退化图像没有差分阶段.
    #[test]
    fn test_degenerate_single_row() {
        let src = XimImage::from_array(array![[5, 6, 7, 8]], PropertyTable::default());
        let mut bytes = Vec::new();
        src.write(&mut bytes, true).unwrap();

        let img = XimImage::parse(&mut Cursor::new(&bytes), true).unwrap();
        assert_eq!(img.array().unwrap(), &array![[5, 6, 7, 8]]);
    }

    #[test]
    fn test_empty_image() {
        let src = XimImage::from_array(Array2::zeros((0, 0)), PropertyTable::default());
        let mut bytes = Vec::new();
        src.write(&mut bytes, true).unwrap();

        let img = XimImage::parse(&mut Cursor::new(&bytes), true).unwrap();
        assert_eq!(img.shape(), (0, 0));
        assert_eq!(img.array().unwrap().len(), 0);
    }

    #[test]
    fn test_to_f64() {
        let src = XimImage::from_array(sample_array(), PropertyTable::default());
        let mut bytes = Vec::new();
        src.write(&mut bytes, true).unwrap();
        let img = XimImage::parse(&mut Cursor::new(&bytes), true).unwrap();

        let f = img.to_f64().unwrap();
        assert_eq!(f[(2, 1)], 70000.0);
        assert_eq!(f[(0, 4)], -4.0);
    }
}
