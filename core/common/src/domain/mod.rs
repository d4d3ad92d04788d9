//! ドメイン型
//!
//! 会話の 1 メッセージ（Turn）と会話履歴、バックエンド設定を表す。

pub mod backend;
pub mod history;

use serde::{Deserialize, Serialize};

pub use backend::{
    AzureOpenAiConfig, BackendConfig, BackendKind, BackendSettings, ConfigField, KaitoLlamaConfig,
    KaitoPhi3Config,
};
pub use history::{History, Snapshot, GREETING};

/// メッセージの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 会話中の 1 メッセージ。作成後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        assert_eq!(Turn::system("s").role(), Role::System);
        assert_eq!(Turn::user("u").role(), Role::User);
        let t = Turn::assistant("a");
        assert_eq!(t.role(), Role::Assistant);
        assert_eq!(t.content(), "a");
    }

    #[test]
    fn test_turn_serializes_as_role_content_object() {
        let json = serde_json::to_value(Turn::user("Hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
