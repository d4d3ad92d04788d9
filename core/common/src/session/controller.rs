//! セッションコントローラ
//!
//! 入力イベントを 1 件ずつ受け取り、状態を更新して描画用スナップショット（View）を返す。
//! 外向きの呼び出しは常に高々 1 件で、完了するまでブロックする。
//! バックエンドの失敗は利用者向けの通知に変換し、セッションは継続する。

use crate::domain::{BackendConfig, BackendKind, ConfigField, History, Turn};
use crate::error::Error;
use crate::llm::kaito_phi3::format_prompt;
use crate::llm::{BackendFactory, BackendInput, ChatBackend};
use crate::ports::outbound::{Log, LogLevel, LogRecord};
use crate::session::render::{render, RenderedTurn};
use crate::session::state::{SessionState, SessionStatus};
use std::sync::Arc;

/// コントローラへの入力イベント
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// バックエンド種別の切り替え（履歴は消さない）
    SelectBackend(BackendKind),
    /// 選択中バックエンドの設定 1 項目を変更
    Configure { field: ConfigField, value: String },
    /// バックエンド設定をまるごと置き換える（種別は設定側のもの）
    ReplaceConfig(BackendConfig),
    /// 利用者の発言
    Submit(String),
    /// 新しい会話
    NewChat,
}

/// 利用者に見せる通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// 設定不足など、操作前の注意
    Warning(String),
    /// 呼び出しの失敗
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Warning(m) | Self::Error(m) => m,
        }
    }
}

/// 描画用スナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub turns: Vec<RenderedTurn>,
    pub status: SessionStatus,
    pub backend: BackendKind,
    pub notice: Option<Notice>,
}

/// バックエンド種別ごとの入力を会話履歴から作る
///
/// - Azure OpenAI / Kaito Llama2Chat: 会話全体
/// - Kaito Phi-3: 最新の user 発言をテンプレートに埋め込んだプロンプト
pub fn build_input(kind: BackendKind, history: &History) -> Result<BackendInput, Error> {
    match kind {
        BackendKind::AzureOpenAi | BackendKind::KaitoLlama2Chat => {
            Ok(BackendInput::Turns(history.snapshot().cloned().collect()))
        }
        BackendKind::KaitoPhi3 => history
            .last_user()
            .map(|t| BackendInput::Prompt(format_prompt(t.content())))
            .ok_or_else(|| Error::invalid_argument("no user message to send")),
    }
}

/// 設定不足時の注意文
fn not_configured_message(kind: BackendKind) -> String {
    match kind {
        BackendKind::AzureOpenAi => format!("{} information not set!", kind),
        BackendKind::KaitoLlama2Chat | BackendKind::KaitoPhi3 => "Model endpoint not set!".to_string(),
    }
}

/// 失敗を利用者向けの文面にする
fn failure_message(kind: BackendKind, error: &Error) -> String {
    match (kind, error) {
        // Llama2Chat は会話が長くなりすぎると 400 を返す
        (BackendKind::KaitoLlama2Chat, Error::Request { status: Some(400), .. }) => format!(
            "Sorry, we've reached my chat limit. Start a new chat to continue. ({})",
            error
        ),
        _ => error.to_string(),
    }
}

/// セッションコントローラ
pub struct SessionController {
    state: SessionState,
    factory: Arc<dyn BackendFactory>,
    log: Arc<dyn Log>,
    backend: Option<Box<dyn ChatBackend>>,
    status: SessionStatus,
}

impl SessionController {
    /// 状態を受け取り、選択中の設定が使用可能ならアダプタを作って Ready にする
    pub fn new(state: SessionState, factory: Arc<dyn BackendFactory>, log: Arc<dyn Log>) -> Self {
        let mut controller = Self {
            state,
            factory,
            log,
            backend: None,
            status: SessionStatus::Idle,
        };
        controller.log_event(
            LogRecord::new(LogLevel::Info, "session created")
                .kind("lifecycle")
                .field("backend", controller.state.selected().as_str()),
        );
        controller.rebuild_backend();
        controller
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &History {
        self.state.history()
    }

    /// 現在の状態の描画用スナップショット
    pub fn view(&self) -> View {
        self.view_with(None)
    }

    /// イベントを 1 件処理する
    ///
    /// `on_chunk` は Submit 中に受信した部分テキストを順に受け取る。
    pub fn handle(&mut self, event: SessionEvent, on_chunk: &mut dyn FnMut(&str)) -> View {
        let notice = match event {
            SessionEvent::SelectBackend(kind) => {
                self.state.select(kind);
                self.rebuild_backend();
                None
            }
            SessionEvent::Configure { field, value } => {
                let kind = self.state.selected();
                match self.state.settings_mut().set(kind, field, &value) {
                    Ok(()) => {
                        self.rebuild_backend();
                        None
                    }
                    Err(e) => Some(Notice::Error(e.to_string())),
                }
            }
            SessionEvent::ReplaceConfig(config) => {
                self.state.settings_mut().replace(config);
                self.rebuild_backend();
                None
            }
            SessionEvent::Submit(text) => self.submit(&text, on_chunk),
            SessionEvent::NewChat => {
                self.state.reset();
                self.log_event(LogRecord::new(LogLevel::Info, "new chat").kind("lifecycle"));
                None
            }
        };
        self.view_with(notice)
    }

    /// セッション終了。状態を返して破棄する。
    pub fn end(self) -> SessionState {
        self.log_event(
            LogRecord::new(LogLevel::Info, "session ended")
                .kind("lifecycle")
                .field("turns", self.state.history().len()),
        );
        self.state
    }

    fn view_with(&self, notice: Option<Notice>) -> View {
        View {
            turns: render(self.state.history().snapshot()),
            status: self.status,
            backend: self.state.selected(),
            notice,
        }
    }

    /// 選択中の設定からアダプタを作り直す。使用可能でなければ Idle。
    fn rebuild_backend(&mut self) {
        let config = self.state.active_config();
        self.backend = if config.is_usable() {
            match self.factory.create(&config) {
                Ok(backend) => Some(backend),
                Err(e) => {
                    self.log_event(
                        LogRecord::new(LogLevel::Warn, "backend construction failed")
                            .kind("config")
                            .field("error", e.to_string()),
                    );
                    None
                }
            }
        } else {
            None
        };
        self.status = if self.backend.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::Idle
        };
        self.log_event(
            LogRecord::new(LogLevel::Info, "backend configured")
                .kind("config")
                .field("backend", config.kind().as_str())
                .field("status", self.status.as_str()),
        );
    }

    fn submit(&mut self, text: &str, on_chunk: &mut dyn FnMut(&str)) -> Option<Notice> {
        if text.trim().is_empty() {
            return None;
        }
        let kind = self.state.selected();
        let Some(backend) = self.backend.as_ref() else {
            return Some(Notice::Warning(not_configured_message(kind)));
        };

        self.state.history_mut().append(Turn::user(text));
        self.status = SessionStatus::Busy;

        let result = build_input(kind, self.state.history())
            .and_then(|input| backend.reply(&input, on_chunk));

        self.status = SessionStatus::Ready;
        match result {
            Ok(reply) => {
                self.log_event(
                    LogRecord::new(LogLevel::Info, "backend replied")
                        .kind("backend")
                        .field("backend", kind.as_str())
                        .field("chars", reply.chars().count()),
                );
                self.state.history_mut().append(Turn::assistant(reply));
                None
            }
            Err(e) => {
                let mut record = LogRecord::new(LogLevel::Warn, "backend call failed")
                    .kind("backend")
                    .field("backend", kind.as_str())
                    .field("error_kind", e.kind())
                    .field("error", e.to_string());
                if let Error::Request {
                    status: Some(code), ..
                } = &e
                {
                    record = record.field("status", *code);
                }
                self.log_event(record);
                Some(Notice::Error(failure_message(kind, &e)))
            }
        }
    }

    fn log_event(&self, record: LogRecord) {
        let _ = self.log.log(&record.layer("session"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::NoopLog;
    use crate::config::SessionDefaults;
    use crate::domain::Role;
    use std::sync::Mutex;

    /// 受け取った入力を記録し、固定の応答を返すバックエンド
    struct EchoBackend {
        kind: BackendKind,
        inputs: Arc<Mutex<Vec<BackendInput>>>,
        fail: Option<Error>,
    }

    impl ChatBackend for EchoBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn reply(&self, input: &BackendInput, on_chunk: &mut dyn FnMut(&str)) -> Result<String, Error> {
            self.inputs.lock().unwrap().push(input.clone());
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            on_chunk("pong");
            Ok("pong".to_string())
        }
    }

    struct StubFactory {
        inputs: Arc<Mutex<Vec<BackendInput>>>,
        fail: Option<Error>,
    }

    impl BackendFactory for StubFactory {
        fn create(&self, config: &BackendConfig) -> Result<Box<dyn ChatBackend>, Error> {
            config.validate()?;
            Ok(Box::new(EchoBackend {
                kind: config.kind(),
                inputs: Arc::clone(&self.inputs),
                fail: self.fail.clone(),
            }))
        }
    }

    fn usable_defaults() -> SessionDefaults {
        let mut d = SessionDefaults::default();
        d.settings.azure.endpoint = "https://example.openai.azure.com".to_string();
        d.settings.azure.deployment = "gpt-4o".to_string();
        d.settings.llama.endpoint = "http://llama".to_string();
        d.settings.phi3.endpoint = "http://phi3".to_string();
        d
    }

    fn controller(
        defaults: &SessionDefaults,
        fail: Option<Error>,
    ) -> (SessionController, Arc<Mutex<Vec<BackendInput>>>) {
        let inputs = Arc::new(Mutex::new(Vec::new()));
        let factory = Arc::new(StubFactory {
            inputs: Arc::clone(&inputs),
            fail,
        });
        (
            SessionController::new(SessionState::create(defaults), factory, Arc::new(NoopLog)),
            inputs,
        )
    }

    #[test]
    fn test_starts_idle_without_configuration() {
        let (c, _) = controller(&SessionDefaults::default(), None);
        assert_eq!(c.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_starts_ready_with_usable_configuration() {
        let (c, _) = controller(&usable_defaults(), None);
        assert_eq!(c.status(), SessionStatus::Ready);
    }

    #[test]
    fn test_history_grows_by_two_per_submission() {
        let (mut c, _) = controller(&usable_defaults(), None);
        for n in 1..=4 {
            let view = c.handle(SessionEvent::Submit(format!("msg {}", n)), &mut |_| {});
            assert!(view.notice.is_none());
            assert_eq!(c.history().len(), 1 + 2 * n);
        }
        let roles: Vec<Role> = c.history().snapshot().map(|t| t.role()).collect();
        assert_eq!(roles[0], Role::System);
        assert!(roles[1..]
            .chunks(2)
            .all(|pair| pair == [Role::User, Role::Assistant]));
    }

    #[test]
    fn test_chunks_are_forwarded() {
        let (mut c, _) = controller(&usable_defaults(), None);
        let mut chunks = Vec::new();
        c.handle(SessionEvent::Submit("ping".to_string()), &mut |s| {
            chunks.push(s.to_string())
        });
        assert_eq!(chunks, vec!["pong"]);
        assert_eq!(c.history().last().unwrap().content(), "pong");
    }

    #[test]
    fn test_blank_submission_is_ignored() {
        let (mut c, inputs) = controller(&usable_defaults(), None);
        let view = c.handle(SessionEvent::Submit("   ".to_string()), &mut |_| {});
        assert!(view.notice.is_none());
        assert_eq!(c.history().len(), 1);
        assert!(inputs.lock().unwrap().is_empty());
    }

    #[test]
    fn test_submit_while_idle_warns_and_keeps_history() {
        let (mut c, _) = controller(&SessionDefaults::default(), None);
        let view = c.handle(SessionEvent::Submit("hi".to_string()), &mut |_| {});
        assert_eq!(
            view.notice,
            Some(Notice::Warning("Azure OpenAI information not set!".to_string()))
        );
        assert_eq!(c.history().len(), 1);
        assert_eq!(view.status, SessionStatus::Idle);
    }

    #[test]
    fn test_failure_keeps_user_turn_and_returns_to_ready() {
        let (mut c, _) = controller(&usable_defaults(), Some(Error::request(400, "bad request")));
        let view = c.handle(SessionEvent::Submit("hi".to_string()), &mut |_| {});
        assert!(matches!(view.notice, Some(Notice::Error(_))));
        assert_eq!(c.history().len(), 2);
        assert_eq!(c.history().last().unwrap().role(), Role::User);
        assert_eq!(c.status(), SessionStatus::Ready);

        // 失敗後も続けて送信できる
        c.handle(SessionEvent::Submit("again".to_string()), &mut |_| {});
        assert_eq!(c.history().len(), 3);
    }

    #[test]
    fn test_llama_400_mentions_chat_limit() {
        let mut d = usable_defaults();
        d.selected = BackendKind::KaitoLlama2Chat;
        let (mut c, _) = controller(&d, Some(Error::request(400, "too long")));
        let view = c.handle(SessionEvent::Submit("hi".to_string()), &mut |_| {});
        assert!(view
            .notice
            .unwrap()
            .message()
            .starts_with("Sorry, we've reached my chat limit."));
    }

    #[test]
    fn test_new_chat_resets_in_any_state() {
        let (mut c, _) = controller(&usable_defaults(), None);
        c.handle(SessionEvent::Submit("hi".to_string()), &mut |_| {});
        let view = c.handle(SessionEvent::NewChat, &mut |_| {});
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].role, Role::System);
        assert_eq!(view.status, SessionStatus::Ready);

        let (mut idle, _) = controller(&SessionDefaults::default(), None);
        let view = idle.handle(SessionEvent::NewChat, &mut |_| {});
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.status, SessionStatus::Idle);
    }

    #[test]
    fn test_switching_backend_preserves_history() {
        let (mut c, _) = controller(&usable_defaults(), None);
        c.handle(SessionEvent::Submit("hi".to_string()), &mut |_| {});
        let before: Vec<Turn> = c.history().snapshot().cloned().collect();
        let view = c.handle(
            SessionEvent::SelectBackend(BackendKind::KaitoPhi3),
            &mut |_| {},
        );
        let after: Vec<Turn> = c.history().snapshot().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(view.backend, BackendKind::KaitoPhi3);
    }

    #[test]
    fn test_configure_moves_idle_to_ready() {
        let (mut c, _) = controller(&SessionDefaults::default(), None);
        c.handle(SessionEvent::SelectBackend(BackendKind::KaitoPhi3), &mut |_| {});
        assert_eq!(c.status(), SessionStatus::Idle);
        let view = c.handle(
            SessionEvent::Configure {
                field: ConfigField::Endpoint,
                value: "http://phi3".to_string(),
            },
            &mut |_| {},
        );
        assert_eq!(view.status, SessionStatus::Ready);

        // 空にすると Idle に戻る
        c.handle(
            SessionEvent::Configure {
                field: ConfigField::Endpoint,
                value: String::new(),
            },
            &mut |_| {},
        );
        assert_eq!(c.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_invalid_configure_reports_error() {
        let (mut c, _) = controller(&usable_defaults(), None);
        let view = c.handle(
            SessionEvent::Configure {
                field: ConfigField::Temperature,
                value: "hot".to_string(),
            },
            &mut |_| {},
        );
        assert!(matches!(view.notice, Some(Notice::Error(_))));
        assert_eq!(c.status(), SessionStatus::Ready);
    }

    #[test]
    fn test_replace_config() {
        let (mut c, _) = controller(&SessionDefaults::default(), None);
        let mut cfg = BackendConfig::default_for(BackendKind::AzureOpenAi);
        cfg.set(ConfigField::Endpoint, "https://x").unwrap();
        cfg.set(ConfigField::Deployment, "d").unwrap();
        let view = c.handle(SessionEvent::ReplaceConfig(cfg), &mut |_| {});
        assert_eq!(view.status, SessionStatus::Ready);
    }

    #[test]
    fn test_inputs_per_backend() {
        let mut d = usable_defaults();
        d.selected = BackendKind::KaitoPhi3;
        let (mut c, inputs) = controller(&d, None);
        c.handle(SessionEvent::Submit("Q: 2+2".to_string()), &mut |_| {});
        c.handle(
            SessionEvent::SelectBackend(BackendKind::KaitoLlama2Chat),
            &mut |_| {},
        );
        c.handle(SessionEvent::Submit("more".to_string()), &mut |_| {});

        let inputs = inputs.lock().unwrap();
        assert_eq!(
            inputs[0],
            BackendInput::Prompt("<|user|> Q: 2+2<|end|><|assistant|>".to_string())
        );
        match &inputs[1] {
            BackendInput::Turns(turns) => assert_eq!(turns.len(), 4),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_end_returns_state() {
        let (mut c, _) = controller(&usable_defaults(), None);
        c.handle(SessionEvent::Submit("hi".to_string()), &mut |_| {});
        let state = c.end();
        assert_eq!(state.history().len(), 3);
    }

    #[test]
    fn test_build_input_phi3_without_user_turn() {
        assert!(build_input(BackendKind::KaitoPhi3, &History::new()).is_err());
    }
}
