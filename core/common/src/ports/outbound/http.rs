//! HTTP 送受信 Outbound ポート
//!
//! バックエンドアダプタはこの trait 経由でのみネットワークに触れる。
//! 1 回の呼び出しが 1 回の HTTP 往復に対応する（再試行はしない）。

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// 送信するリクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// `Content-Type: application/json` 付きの POST
    pub fn post_json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// ヘッダ値（名前は大文字小文字を区別しない）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 受信したレスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 成功ステータスなら本文を返し、そうでなければ本文を詳細とする `Error::Request`
    pub fn into_success_body(self) -> Result<String, Error> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::request(self.status, self.body))
        }
    }
}

/// HTTP 送受信の抽象
///
/// 実装は `common::adapter::ReqwestTransport`（reqwest blocking）やテスト用のスパイなど。
/// 通信層の失敗（接続拒否・DNS・タイムアウト）は `Error::Request { status: None, .. }` で返す。
pub trait HttpTransport: Send + Sync {
    /// リクエストを送り、レスポンス全体を受け取る
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;

    /// リクエストを送り、成功レスポンスの本文を 1 行ずつ `on_line` に渡す。
    /// 失敗ステータスのときは本文全体を詳細として `Error::Request` を返す。
    fn send_streaming(
        &self,
        request: &HttpRequest,
        on_line: &mut dyn FnMut(&str) -> Result<(), Error>,
    ) -> Result<(), Error>;
}
