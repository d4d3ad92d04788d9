//! 環境変数に置かれた固定トークンを返す TokenProvider

use crate::error::Error;
use crate::ports::outbound::{AccessToken, EnvResolver, TokenProvider};
use std::sync::Arc;

/// 固定トークンを読む環境変数の既定名
pub const DEFAULT_TOKEN_ENV: &str = "AZURE_OPENAI_AD_TOKEN";

/// 環境変数のトークンをそのまま返す（有効期限は不明扱い）
pub struct EnvTokenProvider {
    env: Arc<dyn EnvResolver>,
    var_name: String,
}

impl EnvTokenProvider {
    pub fn new(env: Arc<dyn EnvResolver>, var_name: impl Into<String>) -> Self {
        Self {
            env,
            var_name: var_name.into(),
        }
    }
}

impl TokenProvider for EnvTokenProvider {
    fn get_token(&self, _scope: &str) -> Result<AccessToken, Error> {
        self.env
            .var(&self.var_name)
            .map(|t| AccessToken::new(t.trim(), None))
            .ok_or_else(|| Error::provider_auth(format!("{} is not set", self.var_name)))
    }
}

/// 固定の結果を返す TokenProvider（テストや事前取得済みトークン用）
pub struct StaticTokenProvider {
    result: Result<AccessToken, Error>,
}

impl StaticTokenProvider {
    pub fn token(token: &str) -> Self {
        Self {
            result: Ok(AccessToken::new(token, None)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(Error::provider_auth(message)),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_token(&self, _scope: &str) -> Result<AccessToken, Error> {
        self.result.clone()
    }
}
