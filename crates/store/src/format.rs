use ohlc_core::store::error::StoreError;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// # Summary
/// 单行 JSON 格式：逗号后、冒号后各带一个空格，例如 `{"a": [1, 2.0]}`。
///
/// # Invariants
/// - 不换行、不缩进，除分隔符外与紧凑格式一致。
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// 使用 [`SpacedFormatter`] 序列化为字符串。
pub fn to_spaced_string<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| StoreError::Serialize(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| StoreError::Serialize(e.to_string()))
}
