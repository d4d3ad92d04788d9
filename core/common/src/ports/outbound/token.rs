//! 資格情報 Outbound ポート
//!
//! クラウドバックエンドへの呼び出しに付ける Bearer トークンを取得する能力。
//! キャッシュと更新は実装側の責務で、呼び出し側からは見えない。

use crate::error::Error;

/// 有効期限付きのアクセストークン
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// 有効期限（Unix epoch 秒）。不明なら None。
    pub expires_on: Option<i64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: Option<i64>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }
}

// トークン本体はログに出さない
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Bearer トークン取得の抽象
///
/// 実装は `common::adapter::ChainedTokenProvider` などの標準実装、またはテスト用の固定値。
/// 取得に失敗したときは `Error::ProviderAuth` を返す。
pub trait TokenProvider: Send + Sync {
    /// `scope` に対するトークンを返す
    fn get_token(&self, scope: &str) -> Result<AccessToken, Error>;
}
