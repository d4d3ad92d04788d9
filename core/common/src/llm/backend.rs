//! バックエンドアダプタのトレイト定義

use crate::domain::{BackendKind, Turn};
use crate::error::Error;

/// アダプタに渡す入力。会話全体を送る形式と、プロンプト文字列だけを送る形式がある。
#[derive(Debug, Clone, PartialEq)]
pub enum BackendInput {
    Turns(Vec<Turn>),
    Prompt(String),
}

impl BackendInput {
    pub fn as_turns(&self) -> Option<&[Turn]> {
        match self {
            Self::Turns(turns) => Some(turns),
            Self::Prompt(_) => None,
        }
    }

    pub fn as_prompt(&self) -> Option<&str> {
        match self {
            Self::Prompt(p) => Some(p),
            Self::Turns(_) => None,
        }
    }
}

/// バックエンドアダプタのトレイト
///
/// 各バックエンド（Azure OpenAI、Kaito Llama2Chat、Kaito Phi-3）はこのトレイトを実装する。
/// 実装は使用可能な設定からしか作られない（作成時に検証する）。
pub trait ChatBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// 外向きの呼び出しを 1 回だけ行い、応答テキストを返す
    ///
    /// # Arguments
    /// * `input` - 会話またはプロンプト文字列
    /// * `on_chunk` - 受信した部分テキストを順に受け取る（一括応答のバックエンドでは全文で 1 回）
    ///
    /// # Returns
    /// * `Ok(String)` - 応答テキスト全体（部分テキストの連結）
    /// * `Err(Error)` - Request / ResponseFormat / ProviderAuth など。再試行はしない。
    fn reply(&self, input: &BackendInput, on_chunk: &mut dyn FnMut(&str)) -> Result<String, Error>;
}

/// 入力の形がバックエンドに合わないときのエラー
pub(crate) fn wrong_input(kind: BackendKind, expected: &str) -> Error {
    Error::invalid_argument(format!("{} expects {} input", kind, expected))
}
