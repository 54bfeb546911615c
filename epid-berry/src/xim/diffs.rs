//! 变宽差分流的成块读写.
//!
//! 每个差分值按其选择子占 1/2/4 字节. 读取时把选择子序列切成
//! 等宽度的连续段, 每段一次性读入再批量转换, 以避免逐元素的流调用.
//! 读取顺序与选择子顺序严格一致, 流光标单调前进.

use super::{reader, ParseError};
use crate::consts::xim::selector_width;
use itertools::Itertools;
use std::io::Read;

/// 按 `selectors` 的前 `count` 项从流中读出 `count` 个差分值.
///
/// 查找表按 4 对齐, 超出 `count` 的尾部选择子是补齐位, 不对应流数据.
/// 夹在两次宽度切换之间的单元素段与普通段走同一条路径, 不会错读.
pub(super) fn read_diffs<R: Read>(
    selectors: &[u8],
    count: usize,
    r: &mut R,
) -> Result<Vec<i32>, ParseError> {
    if selectors.len() < count {
        return Err(ParseError::LookupTableTooShort {
            have: selectors.len(),
            need: count,
        });
    }

    let mut diffs = Vec::with_capacity(count);
    let runs = selectors[..count].iter().group_by(|&&s| s);
    for (sel, run) in &runs {
        let run_len = run.count();
        let width = selector_width(sel).ok_or(ParseError::BadWidthSelector(sel))?;
        let buf = reader::read_exact_vec(r, run_len * width)?;
        match width {
            1 => diffs.extend(buf.iter().map(|&b| b as i8 as i32)),
            2 => diffs.extend(
                buf.chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]) as i32),
            ),
            _ => diffs.extend(
                buf.chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            ),
        }
    }
    Ok(diffs)
}

/// 能容纳 `diff` 的最小宽度对应的选择子.
pub(super) fn minimal_selector(diff: i32) -> u8 {
    if i8::try_from(diff).is_ok() {
        0
    } else if i16::try_from(diff).is_ok() {
        1
    } else {
        2
    }
}

/// 以逐值最小宽度编码差分序列. 返回 `(选择子序列, 负载字节)`.
pub(super) fn encode_diffs(diffs: &[i32]) -> (Vec<u8>, Vec<u8>) {
    let mut selectors = Vec::with_capacity(diffs.len());
    let mut payload = Vec::new();
    for &d in diffs {
        let sel = minimal_selector(d);
        selectors.push(sel);
        match sel {
            0 => payload.push((d as i8) as u8),
            1 => payload.extend_from_slice(&(d as i16).to_le_bytes()),
            _ => payload.extend_from_slice(&d.to_le_bytes()),
        }
    }
    (selectors, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(diffs: &[i32]) -> Vec<i32> {
        let (selectors, payload) = encode_diffs(diffs);
        read_diffs(&selectors, diffs.len(), &mut Cursor::new(payload)).unwrap()
    }

    #[test]
    fn test_minimal_selector() {
        assert_eq!(minimal_selector(0), 0);
        assert_eq!(minimal_selector(127), 0);
        assert_eq!(minimal_selector(-128), 0);
        assert_eq!(minimal_selector(128), 1);
        assert_eq!(minimal_selector(-129), 1);
        assert_eq!(minimal_selector(32767), 1);
        assert_eq!(minimal_selector(32768), 2);
        assert_eq!(minimal_selector(i32::MIN), 2);
    }

    #[test]
    fn test_roundtrip_mixed_widths() {
        let diffs = [0, -1, 127, 128, -32768, 70000, -70000, 3, 3, 3];
        assert_eq!(decode(&diffs), diffs);
    }

    // 两次宽度切换之间长度为 1 的段曾是该格式的易错点:
    // 段不能被跳过, 也不能吞掉相邻段的字节.
    #[test]
    fn test_single_element_run_between_switches() {
        let diffs = [300, 5, -300];
        assert_eq!(decode(&diffs), diffs);

        // 切换点两侧各保留更长的段.
        let diffs = [1, 2, 400, 3, 4, 500, 600, -7];
        assert_eq!(decode(&diffs), diffs);
    }

    #[test]
    fn test_read_order_is_stream_order() {
        // 选择子 [1, 0, 1]: 2 字节, 1 字节, 2 字节, 其后的字节不受影响.
        let (selectors, mut payload) = encode_diffs(&[300, 5, -300]);
        assert_eq!(selectors, vec![1, 0, 1]);
        payload.push(0xAB);

        let mut c = Cursor::new(payload);
        let got = read_diffs(&selectors, 3, &mut c).unwrap();
        assert_eq!(got, vec![300, 5, -300]);

        let mut rest = Vec::new();
        std::io::Read::read_to_end(&mut c, &mut rest).unwrap();
        assert_eq!(rest, vec![0xAB]);
    }

    #[test]
    fn test_padding_selectors_not_read() {
        // count = 2, 查找表给出 4 个选择子: 后两个是补齐位.
        let selectors = [0u8, 0, 2, 2];
        let mut c = Cursor::new(vec![7u8, 0xF9]);
        let got = read_diffs(&selectors, 2, &mut c).unwrap();
        assert_eq!(got, vec![7, -7]);
    }

    #[test]
    fn test_exhausted_stream() {
        let selectors = [2u8, 2];
        let err = read_diffs(&selectors, 2, &mut Cursor::new(vec![0u8; 6])).unwrap_err();
        assert!(matches!(err, ParseError::TruncatedStream));
    }

    #[test]
    fn test_bad_selector() {
        let selectors = [0u8, 3];
        let err = read_diffs(&selectors, 2, &mut Cursor::new(vec![0u8; 8])).unwrap_err();
        assert!(matches!(err, ParseError::BadWidthSelector(3)));
    }

    #[test]
    fn test_lookup_table_too_short() {
        let selectors = [0u8; 3];
        let err = read_diffs(&selectors, 4, &mut Cursor::new(vec![0u8; 8])).unwrap_err();
        assert!(matches!(
            err,
            ParseError::LookupTableTooShort { have: 3, need: 4 }
        ));
    }
}
