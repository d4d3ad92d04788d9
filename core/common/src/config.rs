//! 環境変数からの既定設定
//!
//! 起動時の選択バックエンドと各バックエンドの接続設定を環境変数から組み立てる。
//! ここで作った値は利用者がコマンドラインや実行中のコマンドで上書きできる。

use crate::domain::backend::{parse_temperature, DEFAULT_AZURE_API_VERSION, DEFAULT_SYSTEM_MESSAGE};
use crate::domain::{BackendKind, BackendSettings};
use crate::error::Error;
use crate::ports::outbound::EnvResolver;
use std::time::Duration;

pub const ENV_SELECTED_MODEL: &str = "SELECTED_MODEL";
pub const ENV_AZURE_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_AZURE_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_AZURE_DEPLOYMENT: &str = "AZURE_OPENAI_MODEL_DEPLOYMENT_NAME";
pub const ENV_MODEL_ENDPOINT: &str = "MODEL_ENDPOINT";
pub const ENV_SYSTEM_MESSAGE: &str = "SYSTEM_MESSAGE";
pub const ENV_TEMPERATURE: &str = "CHATTERBOX_TEMPERATURE";
pub const ENV_HTTP_TIMEOUT: &str = "CHATTERBOX_HTTP_TIMEOUT_SECS";
pub const ENV_LOG_FILE: &str = "CHATTERBOX_LOG_FILE";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// セッション開始時の既定値
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub selected: BackendKind,
    pub settings: BackendSettings,
    pub http_timeout: Duration,
    pub log_file: Option<String>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            selected: BackendKind::AzureOpenAi,
            settings: BackendSettings::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_file: None,
        }
    }
}

impl SessionDefaults {
    /// 環境変数から既定値を作る
    ///
    /// `SELECTED_MODEL` が未知の名前なら Azure OpenAI を選ぶ。
    /// 数値の環境変数が解釈できない場合は `Error::InvalidArgs`。
    pub fn from_env(env: &dyn EnvResolver) -> Result<Self, Error> {
        let mut defaults = Self::default();

        if let Some(selected) = env.var(ENV_SELECTED_MODEL) {
            defaults.selected = selected.parse().unwrap_or(BackendKind::AzureOpenAi);
        }

        let s = &mut defaults.settings;
        s.azure.api_version = env
            .var(ENV_AZURE_API_VERSION)
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
        s.azure.endpoint = env.var(ENV_AZURE_ENDPOINT).unwrap_or_default();
        s.azure.deployment = env.var(ENV_AZURE_DEPLOYMENT).unwrap_or_default();

        // Kaito の 2 種類はエンドポイント入力を共有する
        let model_endpoint = env.var(ENV_MODEL_ENDPOINT).unwrap_or_default();
        s.llama.endpoint = model_endpoint.clone();
        s.phi3.endpoint = model_endpoint;
        s.llama.system_message = Some(
            env.var(ENV_SYSTEM_MESSAGE)
                .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
        );

        if let Some(raw) = env.var(ENV_TEMPERATURE) {
            let t = parse_temperature(&raw)?;
            s.llama.temperature = t;
            s.phi3.temperature = t;
            s.azure.temperature = Some(t);
        }

        if let Some(raw) = env.var(ENV_HTTP_TIMEOUT) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::invalid_argument(format!("{} must be a whole number: '{}'", ENV_HTTP_TIMEOUT, raw))
            })?;
            if secs == 0 {
                return Err(Error::invalid_argument(format!(
                    "{} must be greater than zero",
                    ENV_HTTP_TIMEOUT
                )));
            }
            defaults.http_timeout = Duration::from_secs(secs);
        }

        defaults.log_file = env.var(ENV_LOG_FILE);
        Ok(defaults)
    }
}
