//! 通用常量.

/// `.xim` 文件格式常量.
pub mod xim {
    /// 文件开头的 8 字节魔数.
    pub const MAGIC: [u8; 8] = *b"VMS.XI\0\0";

    /// 写出文件时填入的格式版本号. 解码端不校验该字段.
    pub const FORMAT_VERSION: i32 = 1;

    /// 属性类型标签: 4 字节有符号整数.
    pub const PROP_INT: i32 = 0;

    /// 属性类型标签: 8 字节双精度浮点数.
    pub const PROP_DOUBLE: i32 = 1;

    /// 属性类型标签: 长度前缀字符串.
    pub const PROP_STRING: i32 = 2;

    /// 属性类型标签: 双精度浮点数组 (前缀为字节数, 非元素数).
    pub const PROP_DOUBLE_ARRAY: i32 = 4;

    /// 属性类型标签: 整数数组 (前缀为字节数, 非元素数).
    pub const PROP_INT_ARRAY: i32 = 5;

    /// 选择子对应的差分值字节宽度. 合法选择子只有 0/1/2 三种.
    #[inline]
    pub const fn selector_width(sel: u8) -> Option<usize> {
        match sel {
            0 => Some(1),
            1 => Some(2),
            2 => Some(4),
            _ => None,
        }
    }
}
