//! Kaito Phi-3-mini-128k-instruct アダプタ
//!
//! プロンプト文字列だけを送る。バックエンドは応答の先頭にプロンプトをそのまま付けて返すため、
//! 最初の 1 回だけ取り除いて前後の空白を削る。

use crate::domain::{BackendConfig, BackendKind, KaitoPhi3Config};
use crate::error::Error;
use crate::llm::backend::{wrong_input, BackendInput, ChatBackend};
use crate::ports::outbound::{HttpRequest, HttpTransport};
use serde_json::{json, Value};
use std::sync::Arc;

/// user の発言を Phi-3 のチャットテンプレートに埋め込む
pub fn format_prompt(user_text: &str) -> String {
    format!("<|user|> {}<|end|><|assistant|>", user_text)
}

/// Kaito Phi-3 バックエンド
pub struct KaitoPhi3Backend {
    config: KaitoPhi3Config,
    http: Arc<dyn HttpTransport>,
}

impl KaitoPhi3Backend {
    /// エンドポイントが空なら `Error::Configuration`（通信はしない）
    pub fn new(config: KaitoPhi3Config, http: Arc<dyn HttpTransport>) -> Result<Self, Error> {
        BackendConfig::KaitoPhi3(config.clone()).validate()?;
        Ok(Self { config, http })
    }

    pub fn make_request_payload(&self, prompt: &str) -> Value {
        json!({ "prompt": prompt })
    }
}

/// `Result` からプロンプトの反響を取り除く
pub fn parse_response_text(body: &str, prompt: &str) -> Result<String, Error> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| Error::response_format(format!("Failed to parse response JSON: {}", e), body))?;
    let result = v["Result"]
        .as_str()
        .ok_or_else(|| Error::response_format("missing Result", body))?;
    Ok(result.replacen(prompt, "", 1).trim().to_string())
}

impl ChatBackend for KaitoPhi3Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::KaitoPhi3
    }

    fn reply(&self, input: &BackendInput, on_chunk: &mut dyn FnMut(&str)) -> Result<String, Error> {
        let prompt = input
            .as_prompt()
            .ok_or_else(|| wrong_input(self.kind(), "a prompt"))?;
        let body = serde_json::to_string(&self.make_request_payload(prompt))?;
        let request = HttpRequest::post_json(self.config.endpoint.trim(), body);
        let body = self.http.send(&request)?.into_success_body()?;
        let text = parse_response_text(&body, prompt)?;
        on_chunk(&text);
        Ok(text)
    }
}
