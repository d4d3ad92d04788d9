//! エラーハンドリング
//!
//! アダプタ層・セッション層・CLI で共通のエラー型。
//! バックエンド呼び出しの失敗は `Configuration` / `Request` / `ResponseFormat` / `ProviderAuth`
//! の 4 種類に分類され、呼び出し元（セッション）で利用者向けの通知に変換される。

use thiserror::Error as ThisError;

/// ResponseFormat に含める生レスポンスの最大文字数
const RAW_EXCERPT_MAX: usize = 200;

/// 共通エラー型
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error {
    /// 必須の設定項目が空。ネットワーク呼び出しは行われていない。
    #[error("configuration error: {0}")]
    Configuration(String),

    /// バックエンドが失敗ステータスを返した、または通信自体に失敗した（status = None）
    #[error("{}", format_request(.status, .body))]
    Request { status: Option<u16>, body: String },

    /// レスポンスを期待する構造として解釈できない
    #[error("unexpected response format: {message} (raw: {raw})")]
    ResponseFormat { message: String, raw: String },

    /// 資格情報（Bearer トークン）の取得に失敗した
    #[error("credential acquisition failed: {0}")]
    ProviderAuth(String),

    /// 引数不正
    #[error("invalid argument: {0}")]
    InvalidArgs(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

fn format_request(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("request failed with HTTP {}: {}", code, body),
        None => format!("request failed: {}", body),
    }
}

impl Error {
    /// 設定不備
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// 失敗ステータス付きのリクエストエラー
    pub fn request(status: u16, body: impl Into<String>) -> Self {
        Error::Request {
            status: Some(status),
            body: body.into(),
        }
    }

    /// 通信層の失敗（接続拒否・DNS・タイムアウト等）
    pub fn http(msg: impl Into<String>) -> Self {
        Error::Request {
            status: None,
            body: msg.into(),
        }
    }

    /// レスポンス形式エラー。`raw` は先頭 200 文字に切り詰める。
    pub fn response_format(msg: impl Into<String>, raw: &str) -> Self {
        Error::ResponseFormat {
            message: msg.into(),
            raw: excerpt(raw),
        }
    }

    pub fn provider_auth(msg: impl Into<String>) -> Self {
        Error::ProviderAuth(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgs(msg.into())
    }

    pub fn io_msg(msg: impl Into<String>) -> Self {
        Error::Io(msg.into())
    }

    pub fn json(msg: impl Into<String>) -> Self {
        Error::Json(msg.into())
    }

    /// プロセス終了コード（sysexits 準拠）
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration(_) | Error::InvalidArgs(_) => 64,
            Error::Json(_) | Error::ResponseFormat { .. } => 65,
            Error::Request { .. } | Error::ProviderAuth(_) | Error::Io(_) => 74,
        }
    }

    /// 使い方の誤り（Usage を出すべきもの）
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::InvalidArgs(_))
    }

    /// ログ用の短い分類名
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Request { .. } => "request",
            Error::ResponseFormat { .. } => "response_format",
            Error::ProviderAuth(_) => "provider_auth",
            Error::InvalidArgs(_) => "invalid_args",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

fn excerpt(raw: &str) -> String {
    let count = raw.chars().count();
    if count <= RAW_EXCERPT_MAX {
        return raw.to_string();
    }
    let head: String = raw.chars().take(RAW_EXCERPT_MAX).collect();
    format!("{}... (len={})", head, count)
}
