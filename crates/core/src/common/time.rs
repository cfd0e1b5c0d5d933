use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};

/// # Summary
/// 时钟接口，隔离物理系统时间。
/// 一次抓取任务只调用一次 `now()`，所有周期共享同一个截止时刻。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;

    /// 当前时间的毫秒时间戳
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// 直接读取操作系统时间的真实时钟。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试用的可拨动时钟。
///
/// # Invariants
/// - 读写通过 `RwLock` 保护；锁中毒时沿用已有值。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 以毫秒时间戳创建时钟，非法时间戳退化为 Unix 纪元。
    pub fn from_millis(ms: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(ms).unwrap_or_default())
    }

    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *time = new_time;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *time += delta;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_moves_only_when_told() {
        let clock = FakeClockProvider::from_millis(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        assert_eq!(clock.now_ms(), 1_000);

        clock.advance(chrono::Duration::milliseconds(500));
        assert_eq!(clock.now_ms(), 1_500);

        clock.set_time(DateTime::from_timestamp_millis(42).unwrap());
        assert_eq!(clock.now_ms(), 42);
    }
}
