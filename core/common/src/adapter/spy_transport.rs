//! 台本どおりに応答し、送られたリクエストを記録する HttpTransport（テスト用）
//!
//! ネットワークに出ずにアダプタの送信内容と呼び出し回数を検証するために使う。

use crate::error::Error;
use crate::ports::outbound::{HttpRequest, HttpResponse, HttpTransport};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct SpyTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, Error>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl SpyTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次の呼び出しで返すレスポンスを積む
    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Ok(HttpResponse::new(status, body)));
        self
    }

    /// 次の呼び出しで返す通信エラーを積む
    pub fn fail(self, error: Error) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<HttpResponse, Error>) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(response);
        }
    }

    /// これまでの呼び出し回数
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(Error::http("no scripted response")))
    }
}

impl HttpTransport for SpyTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.next(request)
    }

    fn send_streaming(
        &self,
        request: &HttpRequest,
        on_line: &mut dyn FnMut(&str) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let body = self.next(request)?.into_success_body()?;
        for line in body.lines() {
            on_line(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spy_records_and_replays_in_order() {
        let spy = SpyTransport::new().respond(200, "a").respond(400, "b");
        let req = HttpRequest::post_json("http://x", "{}");
        assert_eq!(spy.send(&req).unwrap().body, "a");
        assert_eq!(spy.send(&req).unwrap().status, 400);
        assert!(spy.send(&req).is_err());
        assert_eq!(spy.calls(), 3);
    }

    #[test]
    fn test_spy_streaming_splits_lines() {
        let spy = SpyTransport::new().respond(200, "one\ntwo\n");
        let mut lines = Vec::new();
        spy.send_streaming(&HttpRequest::get("http://x"), &mut |l| {
            lines.push(l.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_spy_streaming_error_status() {
        let spy = SpyTransport::new().respond(429, "slow down");
        let err = spy
            .send_streaming(&HttpRequest::get("http://x"), &mut |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, Error::request(429, "slow down"));
    }
}
