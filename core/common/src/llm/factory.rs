//! バックエンドファクトリー
//!
//! 設定の種別に応じて適切なアダプタを作成する。使用可能でない設定からは作らない。

use crate::domain::{BackendConfig, BackendKind};
use crate::error::Error;
use crate::llm::azure_openai::AzureOpenAiBackend;
use crate::llm::backend::{BackendInput, ChatBackend};
use crate::llm::kaito_llama::KaitoLlamaBackend;
use crate::llm::kaito_phi3::KaitoPhi3Backend;
use crate::ports::outbound::{HttpTransport, TokenProvider};
use std::sync::Arc;

/// アダプタが使う外部能力
#[derive(Clone)]
pub struct BackendDeps {
    pub http: Arc<dyn HttpTransport>,
    /// Azure OpenAI のみが使う
    pub tokens: Arc<dyn TokenProvider>,
}

/// バックエンドのenumラッパー
///
/// 異なるバックエンドを型安全に扱うために使用する。
pub enum AnyBackend {
    AzureOpenAi(AzureOpenAiBackend),
    KaitoLlama2Chat(KaitoLlamaBackend),
    KaitoPhi3(KaitoPhi3Backend),
}

impl ChatBackend for AnyBackend {
    fn kind(&self) -> BackendKind {
        match self {
            Self::AzureOpenAi(b) => b.kind(),
            Self::KaitoLlama2Chat(b) => b.kind(),
            Self::KaitoPhi3(b) => b.kind(),
        }
    }

    fn reply(&self, input: &BackendInput, on_chunk: &mut dyn FnMut(&str)) -> Result<String, Error> {
        match self {
            Self::AzureOpenAi(b) => b.reply(input, on_chunk),
            Self::KaitoLlama2Chat(b) => b.reply(input, on_chunk),
            Self::KaitoPhi3(b) => b.reply(input, on_chunk),
        }
    }
}

/// 設定からバックエンドを作成する
///
/// 設定が使用可能でなければ、どの外部呼び出しもせずに `Error::Configuration` を返す。
pub fn create_backend(config: &BackendConfig, deps: &BackendDeps) -> Result<AnyBackend, Error> {
    config.validate()?;
    match config {
        BackendConfig::AzureOpenAi(c) => Ok(AnyBackend::AzureOpenAi(AzureOpenAiBackend::new(
            c.clone(),
            Arc::clone(&deps.http),
            Arc::clone(&deps.tokens),
        )?)),
        BackendConfig::KaitoLlama2Chat(c) => Ok(AnyBackend::KaitoLlama2Chat(
            KaitoLlamaBackend::new(c.clone(), Arc::clone(&deps.http))?,
        )),
        BackendConfig::KaitoPhi3(c) => Ok(AnyBackend::KaitoPhi3(KaitoPhi3Backend::new(
            c.clone(),
            Arc::clone(&deps.http),
        )?)),
    }
}

/// セッションがアダプタを作り直すときに使うファクトリーの抽象
pub trait BackendFactory: Send + Sync {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn ChatBackend>, Error>;
}

/// `create_backend` を使う標準ファクトリー
#[derive(Clone)]
pub struct StdBackendFactory {
    deps: BackendDeps,
}

impl StdBackendFactory {
    pub fn new(deps: BackendDeps) -> Self {
        Self { deps }
    }
}

impl BackendFactory for StdBackendFactory {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn ChatBackend>, Error> {
        Ok(Box::new(create_backend(config, &self.deps)?))
    }
}
