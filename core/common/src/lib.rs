//! chatterbox 共通ライブラリ
//!
//! 会話履歴・バックエンド設定・3 種類のバックエンドアダプタ・セッションコントローラを提供します。
//! CLI（`chatterbox` コマンド）はここにある部品を配線するだけです。

/// 標準アダプター（HTTP・トークン・ログ等）
pub mod adapter;

/// 環境変数からの既定設定
pub mod config;

/// 会話履歴とバックエンド設定
pub mod domain;

/// エラーハンドリング
pub mod error;

/// バックエンドアダプタ
pub mod llm;

/// Outbound ポート
pub mod ports;

/// セッション管理
pub mod session;
