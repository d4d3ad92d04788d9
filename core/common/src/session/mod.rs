//! セッション
//!
//! 1 利用者セッション分の状態（会話履歴・バックエンド選択・接続設定）と、
//! 入力イベントを受けて描画用スナップショットを返すコントローラ。

pub mod controller;
pub mod render;
pub mod state;

pub use controller::{build_input, Notice, SessionController, SessionEvent, View};
pub use render::{render, RenderedTurn};
pub use state::{SessionState, SessionStatus};
