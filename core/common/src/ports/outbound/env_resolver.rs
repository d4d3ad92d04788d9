//! 環境変数解決 Outbound ポート
//!
//! 起動時の既定設定（エンドポイント・API バージョン等）を環境変数から読む。
//! usecase / config はこの trait 経由でのみ環境変数にアクセスする。

/// 環境変数解決抽象（Outbound ポート）
///
/// 実装は `common::adapter::StdEnvResolver` やテスト用の `MapEnvResolver` など。
pub trait EnvResolver: Send + Sync {
    /// 値を返す。未設定または空文字列なら None。
    fn var(&self, name: &str) -> Option<String>;
}
