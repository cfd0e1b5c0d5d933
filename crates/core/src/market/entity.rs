use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// # Summary
/// 交易所返回的单根 OHLCV K 线。
///
/// # Invariants
/// - `time_ms` 为 K 线开盘时间（毫秒）。
/// - 下游只使用 `time_ms` 与 `close`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开盘时间
    pub time_ms: i64,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
}

impl Candle {
    pub fn new(time_ms: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// # Summary
/// 图表序列中的一个点 `(timestamp_ms, close)`。
///
/// # Invariants
/// - JSON 形式为两元素数组 `[timestamp_ms, close]`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp_ms: i64,
    pub close: f64,
}

impl From<&Candle> for SeriesPoint {
    fn from(candle: &Candle) -> Self {
        Self {
            timestamp_ms: candle.time_ms,
            close: candle.close,
        }
    }
}

impl Serialize for SeriesPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.timestamp_ms, self.close).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SeriesPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (timestamp_ms, close) = <(i64, f64)>::deserialize(deserializer)?;
        Ok(Self {
            timestamp_ms,
            close,
        })
    }
}

/// # Summary
/// 周期标签到序列的映射（批量模式的输出）。
///
/// # Invariants
/// - 按插入顺序保存，序列化后的键顺序与周期表声明顺序一致。
/// - 同一标签只出现一次，重复插入会覆盖旧值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMap {
    entries: Vec<(String, Vec<SeriesPoint>)>,
}

impl SeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, points: Vec<SeriesPoint>) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = points,
            None => self.entries.push((label, points)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&[SeriesPoint]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, points)| points.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SeriesMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, points) in &self.entries {
            map.serialize_entry(label, points)?;
        }
        map.end()
    }
}

struct SeriesMapVisitor;

impl<'de> Visitor<'de> for SeriesMapVisitor {
    type Value = SeriesMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of timeframe label to [timestamp, close] pairs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut series = SeriesMap::new();
        while let Some((label, points)) = access.next_entry::<String, Vec<SeriesPoint>>()? {
            series.insert(label, points);
        }
        Ok(series)
    }
}

impl<'de> Deserialize<'de> for SeriesMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SeriesMapVisitor)
    }
}
