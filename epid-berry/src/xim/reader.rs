//! 小端基本类型的顺序读取.
//!
//! 所有函数都只向前推进流光标, 不回溯.

use super::ParseError;
use std::io::Read;

/// 读取一个小端 `i32`.
pub(super) fn read_i32<R: Read>(r: &mut R) -> Result<i32, ParseError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// 读取一个小端 `f64`.
pub(super) fn read_f64<R: Read>(r: &mut R) -> Result<f64, ParseError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// 读取一个作为长度前缀的 `i32`, 并检查其非负.
pub(super) fn read_len<R: Read>(r: &mut R) -> Result<usize, ParseError> {
    let v = read_i32(r)?;
    if v < 0 {
        return Err(ParseError::NegativeLength(v));
    }
    Ok(v as usize)
}

/// 精确读取 `n` 个字节.
pub(super) fn read_exact_vec<R: Read>(r: &mut R, n: usize) -> Result<Vec<u8>, ParseError> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// 精确读取 `n` 个小端 `i32`.
pub(super) fn read_i32_vec<R: Read>(r: &mut R, n: usize) -> Result<Vec<i32>, ParseError> {
    let buf = read_exact_vec(r, n * 4)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// 精确读取 `n` 个小端 `f64`.
pub(super) fn read_f64_vec<R: Read>(r: &mut R, n: usize) -> Result<Vec<f64>, ParseError> {
    let buf = read_exact_vec(r, n * 8)?;
    Ok(buf
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

/// 读取长度前缀字符串 (字节数前缀 + 原始字节).
///
/// 属性名与字符串值按 UTF-8 宽松解码, 与来源格式的 ASCII 约定兼容.
pub(super) fn read_string<R: Read>(r: &mut R, n: usize) -> Result<String, ParseError> {
    let buf = read_exact_vec(r, n)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 向前跳过 `n` 个字节, 不保留内容.
pub(super) fn skip<R: Read>(r: &mut R, n: usize) -> Result<(), ParseError> {
    let copied = std::io::copy(&mut r.take(n as u64), &mut std::io::sink()).map_err(ParseError::Io)?;
    if copied < n as u64 {
        return Err(ParseError::TruncatedStream);
    }
    Ok(())
}
