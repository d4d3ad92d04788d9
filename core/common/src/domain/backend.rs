//! バックエンド種別と接続設定
//!
//! 設定は利用者の入力から毎回作り直す。必須の文字列項目がすべて空でないときだけ「使用可能」で、
//! 使用可能でない設定からアダプタを作ってはならない。

use crate::error::Error;
use std::str::FromStr;

/// Azure OpenAI の既定 API バージョン
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Kaito バックエンドの既定 system メッセージ
pub const DEFAULT_SYSTEM_MESSAGE: &str = "Answer using very few words";

/// バックエンド種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Azure OpenAI（構造化マルチターン・ストリーミング）
    AzureOpenAi,
    /// Kaito Llama2Chat（会話を JSON 配列で送る）
    KaitoLlama2Chat,
    /// Kaito Phi-3-mini-128k-instruct（プロンプト文字列のみ）
    KaitoPhi3,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::AzureOpenAi,
        BackendKind::KaitoLlama2Chat,
        BackendKind::KaitoPhi3,
    ];

    /// 画面に出す名前
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AzureOpenAi => "Azure OpenAI",
            Self::KaitoLlama2Chat => "Kaito - Llama2Chat",
            Self::KaitoPhi3 => "Kaito - Phi-3-mini-128k-instruct",
        }
    }

    /// コマンドラインで使う短い名前
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AzureOpenAi => "azure",
            Self::KaitoLlama2Chat => "llama2chat",
            Self::KaitoPhi3 => "phi3",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        BackendKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower || k.display_name().to_lowercase() == lower)
            .or_else(|| match lower.as_str() {
                "azure_openai" | "openai" => Some(Self::AzureOpenAi),
                "llama" | "kaito_llama" => Some(Self::KaitoLlama2Chat),
                "phi-3" | "kaito_phi3" => Some(Self::KaitoPhi3),
                _ => None,
            })
            .ok_or_else(|| Error::invalid_argument(format!("unknown model source: '{}'", s)))
    }
}

/// 実行時に変更できる設定項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Endpoint,
    ApiVersion,
    Deployment,
    Temperature,
    SystemMessage,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::ApiVersion => "api-version",
            Self::Deployment => "deployment",
            Self::Temperature => "temperature",
            Self::SystemMessage => "system",
        }
    }
}

impl FromStr for ConfigField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "endpoint" => Ok(Self::Endpoint),
            "api-version" | "api_version" => Ok(Self::ApiVersion),
            "deployment" | "name" => Ok(Self::Deployment),
            "temperature" => Ok(Self::Temperature),
            "system" | "system-message" | "system_message" => Ok(Self::SystemMessage),
            _ => Err(Error::invalid_argument(format!("unknown setting: '{}'", s))),
        }
    }
}

/// 温度の文字列を解釈して [0.0, 1.0] に収める
pub fn parse_temperature(s: &str) -> Result<f64, Error> {
    let t: f64 = s
        .trim()
        .parse()
        .map_err(|_| Error::invalid_argument(format!("temperature must be a number: '{}'", s)))?;
    if !t.is_finite() {
        return Err(Error::invalid_argument(format!(
            "temperature must be finite: '{}'",
            s
        )));
    }
    Ok(t.clamp(0.0, 1.0))
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Azure OpenAI の接続設定
#[derive(Debug, Clone, PartialEq)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
    /// 未指定ならリクエストに含めない（サービス側の既定値）
    pub temperature: Option<f64>,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            deployment: String::new(),
            temperature: None,
        }
    }
}

/// Kaito Llama2Chat の接続設定
#[derive(Debug, Clone, PartialEq)]
pub struct KaitoLlamaConfig {
    pub endpoint: String,
    pub temperature: f64,
    /// 先頭の挨拶メッセージをこの system メッセージで置き換える
    pub system_message: Option<String>,
}

impl Default for KaitoLlamaConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            temperature: 0.0,
            system_message: Some(DEFAULT_SYSTEM_MESSAGE.to_string()),
        }
    }
}

/// Kaito Phi-3 の接続設定
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KaitoPhi3Config {
    pub endpoint: String,
    pub temperature: f64,
}

/// バックエンドごとの接続設定
#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    AzureOpenAi(AzureOpenAiConfig),
    KaitoLlama2Chat(KaitoLlamaConfig),
    KaitoPhi3(KaitoPhi3Config),
}

impl BackendConfig {
    /// 種別ごとの既定値
    pub fn default_for(kind: BackendKind) -> Self {
        match kind {
            BackendKind::AzureOpenAi => Self::AzureOpenAi(AzureOpenAiConfig::default()),
            BackendKind::KaitoLlama2Chat => Self::KaitoLlama2Chat(KaitoLlamaConfig::default()),
            BackendKind::KaitoPhi3 => Self::KaitoPhi3(KaitoPhi3Config::default()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::AzureOpenAi(_) => BackendKind::AzureOpenAi,
            Self::KaitoLlama2Chat(_) => BackendKind::KaitoLlama2Chat,
            Self::KaitoPhi3(_) => BackendKind::KaitoPhi3,
        }
    }

    /// 空の必須項目名
    pub fn missing_fields(&self) -> Vec<ConfigField> {
        let mut missing = Vec::new();
        match self {
            Self::AzureOpenAi(c) => {
                if is_blank(&c.api_version) {
                    missing.push(ConfigField::ApiVersion);
                }
                if is_blank(&c.endpoint) {
                    missing.push(ConfigField::Endpoint);
                }
                if is_blank(&c.deployment) {
                    missing.push(ConfigField::Deployment);
                }
            }
            Self::KaitoLlama2Chat(c) => {
                if is_blank(&c.endpoint) {
                    missing.push(ConfigField::Endpoint);
                }
            }
            Self::KaitoPhi3(c) => {
                if is_blank(&c.endpoint) {
                    missing.push(ConfigField::Endpoint);
                }
            }
        }
        missing
    }

    pub fn is_usable(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// 使用可能でなければ `Error::Configuration`
    pub fn validate(&self) -> Result<(), Error> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
        Err(Error::configuration(format!(
            "{}: missing {}",
            self.kind(),
            names.join(", ")
        )))
    }

    /// 1 項目を更新する。その種別に存在しない項目は `InvalidArgs`。
    pub fn set(&mut self, field: ConfigField, value: &str) -> Result<(), Error> {
        let unsupported = |kind: BackendKind| {
            Error::invalid_argument(format!(
                "'{}' is not a setting of {}",
                field.as_str(),
                kind
            ))
        };
        match (self, field) {
            (Self::AzureOpenAi(c), ConfigField::Endpoint) => c.endpoint = value.trim().to_string(),
            (Self::AzureOpenAi(c), ConfigField::ApiVersion) => {
                c.api_version = value.trim().to_string()
            }
            (Self::AzureOpenAi(c), ConfigField::Deployment) => {
                c.deployment = value.trim().to_string()
            }
            (Self::AzureOpenAi(c), ConfigField::Temperature) => {
                c.temperature = Some(parse_temperature(value)?)
            }
            (Self::KaitoLlama2Chat(c), ConfigField::Endpoint) => {
                c.endpoint = value.trim().to_string()
            }
            (Self::KaitoLlama2Chat(c), ConfigField::Temperature) => {
                c.temperature = parse_temperature(value)?
            }
            (Self::KaitoLlama2Chat(c), ConfigField::SystemMessage) => {
                c.system_message = Some(value.to_string()).filter(|s| !is_blank(s))
            }
            (Self::KaitoPhi3(c), ConfigField::Endpoint) => c.endpoint = value.trim().to_string(),
            (Self::KaitoPhi3(c), ConfigField::Temperature) => {
                c.temperature = parse_temperature(value)?
            }
            (cfg, _) => return Err(unsupported(cfg.kind())),
        }
        Ok(())
    }
}

/// 3 種類すべての設定（セッションが保持する）
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub azure: AzureOpenAiConfig,
    pub llama: KaitoLlamaConfig,
    pub phi3: KaitoPhi3Config,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            azure: AzureOpenAiConfig::default(),
            llama: KaitoLlamaConfig::default(),
            phi3: KaitoPhi3Config::default(),
        }
    }
}

impl BackendSettings {
    /// 指定種別の設定を複製して返す
    pub fn config_for(&self, kind: BackendKind) -> BackendConfig {
        match kind {
            BackendKind::AzureOpenAi => BackendConfig::AzureOpenAi(self.azure.clone()),
            BackendKind::KaitoLlama2Chat => BackendConfig::KaitoLlama2Chat(self.llama.clone()),
            BackendKind::KaitoPhi3 => BackendConfig::KaitoPhi3(self.phi3.clone()),
        }
    }

    /// 指定種別の設定を置き換える
    pub fn replace(&mut self, config: BackendConfig) {
        match config {
            BackendConfig::AzureOpenAi(c) => self.azure = c,
            BackendConfig::KaitoLlama2Chat(c) => self.llama = c,
            BackendConfig::KaitoPhi3(c) => self.phi3 = c,
        }
    }

    /// 1 項目を更新する。失敗時は何も変えない。
    pub fn set(&mut self, kind: BackendKind, field: ConfigField, value: &str) -> Result<(), Error> {
        let mut config = self.config_for(kind);
        config.set(field, value)?;
        self.replace(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str_accepts_display_and_short_names() {
        assert_eq!("Azure OpenAI".parse::<BackendKind>().unwrap(), BackendKind::AzureOpenAi);
        assert_eq!("azure".parse::<BackendKind>().unwrap(), BackendKind::AzureOpenAi);
        assert_eq!(
            "kaito - llama2chat".parse::<BackendKind>().unwrap(),
            BackendKind::KaitoLlama2Chat
        );
        assert_eq!(
            "Kaito - Phi-3-mini-128k-instruct".parse::<BackendKind>().unwrap(),
            BackendKind::KaitoPhi3
        );
        assert_eq!("PHI3".parse::<BackendKind>().unwrap(), BackendKind::KaitoPhi3);
    }

    #[test]
    fn test_backend_kind_from_str_unknown() {
        let err = "bard".parse::<BackendKind>().unwrap_err();
        assert_eq!(err.exit_code(), 64);
    }

    #[test]
    fn test_azure_default_is_not_usable() {
        let cfg = BackendConfig::default_for(BackendKind::AzureOpenAi);
        assert!(!cfg.is_usable());
        assert_eq!(
            cfg.missing_fields(),
            vec![ConfigField::Endpoint, ConfigField::Deployment]
        );
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let cfg = BackendConfig::default_for(BackendKind::KaitoPhi3);
        match cfg.validate() {
            Err(Error::Configuration(msg)) => assert!(msg.contains("endpoint")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_endpoint_is_blank() {
        let mut cfg = BackendConfig::default_for(BackendKind::KaitoLlama2Chat);
        cfg.set(ConfigField::Endpoint, "   ").unwrap();
        assert!(!cfg.is_usable());
        cfg.set(ConfigField::Endpoint, "http://llama/chat").unwrap();
        assert!(cfg.is_usable());
    }

    #[test]
    fn test_set_unsupported_field() {
        let mut cfg = BackendConfig::default_for(BackendKind::KaitoPhi3);
        let err = cfg.set(ConfigField::Deployment, "x").unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
    }

    #[test]
    fn test_parse_temperature_clamps() {
        assert_eq!(parse_temperature("0.5").unwrap(), 0.5);
        assert_eq!(parse_temperature("3").unwrap(), 1.0);
        assert_eq!(parse_temperature("-1").unwrap(), 0.0);
        assert!(parse_temperature("hot").is_err());
        assert!(parse_temperature("NaN").is_err());
    }

    #[test]
    fn test_settings_set_keeps_old_value_on_error() {
        let mut s = BackendSettings::default();
        s.set(BackendKind::KaitoPhi3, ConfigField::Temperature, "0.3").unwrap();
        assert!(s
            .set(BackendKind::KaitoPhi3, ConfigField::Temperature, "warm")
            .is_err());
        assert_eq!(s.phi3.temperature, 0.3);
    }

    #[test]
    fn test_blank_system_message_clears_override() {
        let mut s = BackendSettings::default();
        s.set(BackendKind::KaitoLlama2Chat, ConfigField::SystemMessage, "")
            .unwrap();
        assert_eq!(s.llama.system_message, None);
    }
}
