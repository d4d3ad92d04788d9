//! 時刻取得 Outbound ポート
//!
//! トークンの有効期限判定に使う。テストでは固定時刻を注入する。

/// 時刻取得の抽象
///
/// 実装は `common::adapter::StdClock` やテスト用の固定時刻など。
pub trait Clock: Send + Sync {
    /// 現在時刻を秒（Unix epoch）で返す
    fn now_secs(&self) -> i64;
}
