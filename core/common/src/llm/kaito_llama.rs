//! Kaito Llama2Chat アダプタ
//!
//! 会話全体を `{role, content}` の JSON 配列にし、バッチ配列の唯一の要素として送る。
//! 応答は最初のバッチ結果の最後の要素の `content`。

use crate::domain::{BackendConfig, BackendKind, KaitoLlamaConfig, Turn};
use crate::error::Error;
use crate::llm::backend::{wrong_input, BackendInput, ChatBackend};
use crate::ports::outbound::{HttpRequest, HttpTransport};
use serde_json::{json, Value};
use std::sync::Arc;

pub const MAX_BATCH_SIZE: u32 = 32;
pub const MAX_GEN_LEN: u32 = 1024;
pub const MAX_SQQ_LEN: u32 = 1024;

/// Kaito Llama2Chat バックエンド
pub struct KaitoLlamaBackend {
    config: KaitoLlamaConfig,
    http: Arc<dyn HttpTransport>,
}

impl KaitoLlamaBackend {
    /// エンドポイントが空なら `Error::Configuration`（通信はしない）
    pub fn new(config: KaitoLlamaConfig, http: Arc<dyn HttpTransport>) -> Result<Self, Error> {
        BackendConfig::KaitoLlama2Chat(config.clone()).validate()?;
        Ok(Self { config, http })
    }

    /// 送信する会話。system メッセージが設定されていれば先頭の system（挨拶）を置き換える。
    pub fn conversation(&self, turns: &[Turn]) -> Vec<Value> {
        let mut rest = turns;
        let mut conversation = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = &self.config.system_message {
            conversation.push(json!({ "role": "system", "content": system }));
            if let Some((first, tail)) = turns.split_first() {
                if first.role() == crate::domain::Role::System {
                    rest = tail;
                }
            }
        }
        conversation.extend(rest.iter().map(|t| json!(t)));
        conversation
    }

    pub fn make_request_payload(&self, turns: &[Turn]) -> Value {
        json!({
            "input_data": {
                "input_string": [self.conversation(turns)],
            },
            "parameters": {
                "temperature": self.config.temperature,
                "max_batch_size": MAX_BATCH_SIZE,
                "max_gen_len": MAX_GEN_LEN,
                "max_sqq_len": MAX_SQQ_LEN,
            },
        })
    }
}

/// `results[0][-1].content` を取り出す
pub fn parse_response_text(body: &str) -> Result<String, Error> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| Error::response_format(format!("Failed to parse response JSON: {}", e), body))?;
    let batch = v["results"]
        .as_array()
        .and_then(|results| results.first())
        .and_then(|first| first.as_array())
        .ok_or_else(|| Error::response_format("missing results[0]", body))?;
    let last = batch
        .last()
        .ok_or_else(|| Error::response_format("results[0] is empty", body))?;
    last["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::response_format("missing content in last result", body))
}

impl ChatBackend for KaitoLlamaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::KaitoLlama2Chat
    }

    fn reply(&self, input: &BackendInput, on_chunk: &mut dyn FnMut(&str)) -> Result<String, Error> {
        let turns = input
            .as_turns()
            .ok_or_else(|| wrong_input(self.kind(), "a conversation"))?;
        let body = serde_json::to_string(&self.make_request_payload(turns))?;
        let request = HttpRequest::post_json(self.config.endpoint.trim(), body);
        let body = self.http.send(&request)?.into_success_body()?;
        let text = parse_response_text(&body)?;
        on_chunk(&text);
        Ok(text)
    }
}
