//! 標準時刻実装（chrono::Utc を委譲）

use crate::ports::outbound::Clock;

/// システム時計を使う Clock 実装
#[derive(Debug, Clone, Default)]
pub struct StdClock;

impl Clock for StdClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// 固定時刻を返す Clock 実装（テスト用）
#[derive(Debug, Clone, Default)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}
