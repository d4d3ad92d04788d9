//! セッション状態
//!
//! 暗黙の共有ストアではなく、コントローラ作成時に明示的に渡される値。
//! 会話履歴と接続設定はこのセッションだけが所有し、他のセッションとは共有しない。

use crate::config::SessionDefaults;
use crate::domain::{BackendConfig, BackendKind, BackendSettings, History};

/// セッションの状態遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// バックエンド未選択、または設定が使用可能でない
    Idle,
    /// アダプタ作成済みで入力待ち
    Ready,
    /// 外向きの呼び出し中
    Busy,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Busy => "busy",
        }
    }
}

/// 1 セッション分の状態
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    history: History,
    selected: BackendKind,
    settings: BackendSettings,
}

impl SessionState {
    /// 既定値から新しいセッション状態を作る
    pub fn create(defaults: &SessionDefaults) -> Self {
        Self {
            history: History::new(),
            selected: defaults.selected,
            settings: defaults.settings.clone(),
        }
    }

    /// 会話履歴だけを初期状態に戻す。選択と設定は残す。
    pub fn reset(&mut self) {
        self.history.reset();
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn selected(&self) -> BackendKind {
        self.selected
    }

    pub fn select(&mut self, kind: BackendKind) {
        self.selected = kind;
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut BackendSettings {
        &mut self.settings
    }

    /// 選択中バックエンドの設定
    pub fn active_config(&self) -> BackendConfig {
        self.settings.config_for(self.selected)
    }
}
