//! 行预测差分的重建与求残差.
//!
//! 预测子为 `left + above - upper_left`. 行优先线性序下, 三个邻居的
//! 线性索引都严格小于当前元素, 因此重建只需一次线性遍历, 不依赖图像内容.

use ndarray::Array2;

/// 由首段非压缩值与差分序列重建完整像素网格.
///
/// `seed` 覆盖首行加第二行首元素 (共 `width + 1` 个值; 若整幅图更小则为整幅),
/// `diffs` 覆盖其余全部元素. 退化图像 (`height * width <= width + 1`)
/// 的差分序列为空, 重建自然跳过差分阶段.
pub(super) fn reconstruct(height: usize, width: usize, seed: &[i32], diffs: &[i32]) -> Array2<i32> {
    let total = height * width;
    debug_assert_eq!(seed.len(), (width + 1).min(total));
    debug_assert_eq!(diffs.len(), total.saturating_sub(width + 1));

    let mut flat = Vec::with_capacity(total);
    flat.extend_from_slice(seed);
    for &d in diffs {
        let idx = flat.len();
        let left = flat[idx - 1];
        let above = flat[idx - width];
        let upper_left = flat[idx - width - 1];
        flat.push(d.wrapping_add(left).wrapping_add(above).wrapping_sub(upper_left));
    }
    // 长度由上面的不变式保证.
    Array2::from_shape_vec((height, width), flat).unwrap()
}

/// [`reconstruct`] 的逆过程. 返回 `(seed, diffs)`.
pub(super) fn residuals(grid: &Array2<i32>) -> (Vec<i32>, Vec<i32>) {
    let (_, width) = grid.dim();
    let flat: Vec<i32> = grid.iter().copied().collect();
    let total = flat.len();
    let seed_len = (width + 1).min(total);

    let diffs = (seed_len..total)
        .map(|i| {
            flat[i]
                .wrapping_sub(flat[i - 1])
                .wrapping_sub(flat[i - width])
                .wrapping_add(flat[i - width - 1])
        })
        .collect();
    (flat[..seed_len].to_vec(), diffs)
}
