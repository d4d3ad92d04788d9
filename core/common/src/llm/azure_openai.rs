//! Azure OpenAI (Chat Completions, ストリーミング) アダプタ
//!
//! 会話を構造化メッセージ列として送り、server-sent events で返る部分テキストを順に受け取る。
//! user 以外の役割はすべて "system" として送る（従来の挙動を維持している）。

use crate::domain::{AzureOpenAiConfig, BackendConfig, BackendKind, Role, Turn};
use crate::error::Error;
use crate::llm::backend::{wrong_input, BackendInput, ChatBackend};
use crate::ports::outbound::{HttpRequest, HttpTransport, TokenProvider};
use serde_json::{json, Value};
use std::sync::Arc;

/// Bearer トークンのスコープ
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Azure OpenAI バックエンド
pub struct AzureOpenAiBackend {
    config: AzureOpenAiConfig,
    http: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenProvider>,
}

impl AzureOpenAiBackend {
    /// 設定が使用可能でなければ `Error::Configuration`（通信はしない）
    pub fn new(
        config: AzureOpenAiConfig,
        http: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, Error> {
        BackendConfig::AzureOpenAi(config.clone()).validate()?;
        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    pub fn make_request_payload(&self, turns: &[Turn]) -> Value {
        let messages: Vec<Value> = turns
            .iter()
            .map(|t| json!({ "role": outbound_role(t.role()), "content": t.content() }))
            .collect();
        let mut payload = json!({
            "messages": messages,
            "stream": true,
        });
        if let Some(t) = self.config.temperature {
            payload["temperature"] = json!(t);
        }
        payload
    }

    fn bearer(&self) -> Result<String, Error> {
        let token = self
            .tokens
            .get_token(COGNITIVE_SERVICES_SCOPE)
            .map_err(|e| match e {
                Error::ProviderAuth(_) => e,
                other => Error::provider_auth(other.to_string()),
            })?;
        Ok(format!("Bearer {}", token.token))
    }
}

/// user は "user"、それ以外はすべて "system"
pub fn outbound_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::System | Role::Assistant => "system",
    }
}

/// SSE 1 行の解釈結果
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// テキストの増分
    Delta(String),
    /// ストリーム終端（`data: [DONE]`）
    Done,
    /// 空行・コメント・テキストを含まないイベント
    Skip,
}

/// `data: {...}` 行から choices[0].delta.content を取り出す
pub fn parse_sse_line(line: &str) -> Result<SseLine, Error> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    let v: Value = serde_json::from_str(data)
        .map_err(|e| Error::response_format(format!("Failed to parse stream JSON: {}", e), data))?;
    if let Some(err) = v.get("error") {
        let msg = err["message"].as_str().unwrap_or("unknown error");
        return Err(Error::http(format!("Azure OpenAI stream error: {}", msg)));
    }
    // コンテンツフィルタ結果だけのイベントは choices が空
    match v["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(SseLine::Delta(text.to_string())),
        _ => Ok(SseLine::Skip),
    }
}

impl ChatBackend for AzureOpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::AzureOpenAi
    }

    fn reply(&self, input: &BackendInput, on_chunk: &mut dyn FnMut(&str)) -> Result<String, Error> {
        let turns = input
            .as_turns()
            .ok_or_else(|| wrong_input(self.kind(), "a conversation"))?;
        let authorization = self.bearer()?;
        let body = serde_json::to_string(&self.make_request_payload(turns))?;
        let request = HttpRequest::post_json(self.url(), body)
            .with_header("Authorization", authorization);

        let mut reply = String::new();
        let mut saw_data = false;
        let mut done = false;
        self.http.send_streaming(&request, &mut |line| {
            if done {
                return Ok(());
            }
            match parse_sse_line(line)? {
                SseLine::Delta(text) => {
                    saw_data = true;
                    on_chunk(&text);
                    reply.push_str(&text);
                }
                SseLine::Done => {
                    saw_data = true;
                    done = true;
                }
                SseLine::Skip => {
                    if line.starts_with("data:") {
                        saw_data = true;
                    }
                }
            }
            Ok(())
        })?;

        if !saw_data {
            return Err(Error::response_format("event stream contained no data", ""));
        }
        Ok(reply)
    }
}
