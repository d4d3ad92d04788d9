//! reqwest (blocking) による HttpTransport 実装
//!
//! 呼び出しは完了か失敗まで同期的にブロックする。取り消し手段が無いため、
//! クライアント全体にタイムアウトを設定して到達不能なエンドポイントで固まらないようにする。

use crate::error::Error;
use crate::ports::outbound::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use std::io::{BufRead, BufReader};
use std::time::Duration;

/// 既定のタイムアウト
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("chatterbox/", env!("CARGO_PKG_VERSION"));

/// reqwest blocking クライアントを使う HttpTransport
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn dispatch(&self, request: &HttpRequest) -> Result<reqwest::blocking::Response, Error> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
            .send()
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let response = self.dispatch(request)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;
        Ok(HttpResponse::new(status, body))
    }

    fn send_streaming(
        &self,
        request: &HttpRequest,
        on_line: &mut dyn FnMut(&str) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let response = self.dispatch(request)?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;
            return Err(Error::request(status.as_u16(), body));
        }

        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line = line.map_err(|e| Error::http(format!("Failed to read stream line: {}", e)))?;
            on_line(&line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_refused_is_request_error_without_status() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        // ポート 9 (discard) は通常 listen されていない
        let req = HttpRequest::post_json("http://127.0.0.1:9/chat", "{}");
        let err = transport.send(&req).unwrap_err();
        assert!(matches!(err, Error::Request { status: None, .. }));
    }

    #[test]
    fn test_user_agent_has_crate_name() {
        assert!(USER_AGENT.starts_with("chatterbox/"));
    }
}
