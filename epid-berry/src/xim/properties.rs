//! `.xim` 属性表.
//!
//! 属性表是文件尾部的有序键值序列: 长度前缀的属性名, 4 字节类型标签,
//! 以及随类型而定的负载. 数组类型的长度前缀是字节数而非元素数.

use super::{reader, ParseError};
use crate::consts::xim::{PROP_DOUBLE, PROP_DOUBLE_ARRAY, PROP_INT, PROP_INT_ARRAY, PROP_STRING};
use std::fmt::Formatter;
use std::io::{Read, Write};

/// 属性值, 五种负载类型之一的带标签联合.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    /// 4 字节有符号整数.
    Int(i32),
    /// 8 字节双精度浮点数.
    Double(f64),
    /// 字符串.
    String(String),
    /// 双精度浮点数组.
    DoubleArray(Vec<f64>),
    /// 整数数组.
    IntArray(Vec<i32>),
}

impl PropertyValue {
    /// 文件中该变体对应的类型标签.
    #[inline]
    pub fn type_tag(&self) -> i32 {
        match self {
            PropertyValue::Int(_) => PROP_INT,
            PropertyValue::Double(_) => PROP_DOUBLE,
            PropertyValue::String(_) => PROP_STRING,
            PropertyValue::DoubleArray(_) => PROP_DOUBLE_ARRAY,
            PropertyValue::IntArray(_) => PROP_INT_ARRAY,
        }
    }
}

/// 人类可读形式, 供报告工具打印.
impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "{v}"),
            PropertyValue::DoubleArray(v) => write!(f, "{v:?}"),
            PropertyValue::IntArray(v) => write!(f, "{v:?}"),
        }
    }
}

/// 属性名到属性值的有序映射.
///
/// 迭代顺序即文件中的出现顺序. 属性名在文件内应当唯一;
/// 若出现重复, 后写入者覆盖先写入者的值, 位置保持首次出现处.
/// 属性个数通常只有几十个, 因此查找用线性扫描实现.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyTable {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyTable {
    /// 写入一个属性. 若属性名已存在则覆盖其值并返回旧值.
    pub fn insert(&mut self, name: String, value: PropertyValue) -> Option<PropertyValue> {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// 按属性名查找属性值.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// 按文件顺序迭代全部属性.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// 属性个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 属性表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 从流中读出 "个数前缀 + 记录序列" 形式的属性表.
pub(super) fn read_properties<R: Read>(r: &mut R) -> Result<PropertyTable, ParseError> {
    let count = reader::read_len(r)?;
    let mut table = PropertyTable::default();
    for _ in 0..count {
        let name_len = reader::read_len(r)?;
        let name = reader::read_string(r, name_len)?;
        let tag = reader::read_i32(r)?;
        let value = match tag {
            PROP_INT => PropertyValue::Int(reader::read_i32(r)?),
            PROP_DOUBLE => PropertyValue::Double(reader::read_f64(r)?),
            PROP_STRING => {
                let num_bytes = reader::read_len(r)?;
                PropertyValue::String(reader::read_string(r, num_bytes)?)
            }
            PROP_DOUBLE_ARRAY => {
                let num_bytes = reader::read_len(r)?;
                PropertyValue::DoubleArray(reader::read_f64_vec(r, num_bytes / 8)?)
            }
            PROP_INT_ARRAY => {
                let num_bytes = reader::read_len(r)?;
                PropertyValue::IntArray(reader::read_i32_vec(r, num_bytes / 4)?)
            }
            other => return Err(ParseError::UnknownPropertyType(other)),
        };
        table.insert(name, value);
    }
    Ok(table)
}

/// [`read_properties`] 的逆过程.
pub(super) fn write_properties<W: Write>(table: &PropertyTable, w: &mut W) -> std::io::Result<()> {
    w.write_all(&(table.len() as i32).to_le_bytes())?;
    for (name, value) in table.iter() {
        w.write_all(&(name.len() as i32).to_le_bytes())?;
        w.write_all(name.as_bytes())?;
        w.write_all(&value.type_tag().to_le_bytes())?;
        match value {
            PropertyValue::Int(v) => w.write_all(&v.to_le_bytes())?,
            PropertyValue::Double(v) => w.write_all(&v.to_le_bytes())?,
            PropertyValue::String(v) => {
                w.write_all(&(v.len() as i32).to_le_bytes())?;
                w.write_all(v.as_bytes())?;
            }
            PropertyValue::DoubleArray(v) => {
                w.write_all(&((v.len() * 8) as i32).to_le_bytes())?;
                for x in v {
                    w.write_all(&x.to_le_bytes())?;
                }
            }
            PropertyValue::IntArray(v) => {
                w.write_all(&((v.len() * 4) as i32).to_le_bytes())?;
                for x in v {
                    w.write_all(&x.to_le_bytes())?;
                }
            }
        }
    }
    Ok(())
}
