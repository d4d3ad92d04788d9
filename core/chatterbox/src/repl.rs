//! 対話ループ
//!
//! 1 行ずつ読み、`/` で始まる行はコマンド、それ以外は発言としてセッションに渡す。
//! 応答は受信した断片ごとに出力する。

use common::domain::{BackendConfig, BackendKind, ConfigField};
use common::error::Error;
use common::session::{Notice, RenderedTurn, SessionController, SessionEvent};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{BufRead, Write};

const PROMPT: &str = "you> ";

/// 1 行を解釈した結果
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Event(SessionEvent),
    /// 現在の設定と状態を表示
    Show,
    /// 会話履歴を表示
    History,
    Help,
    Quit,
}

/// 入力行を解釈する。空行は `None`。
///
/// `//` で始まる行は先頭の `/` を 1 つ外して発言として扱う。
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, Error> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    if let Some(escaped) = line.strip_prefix("//") {
        return Ok(Some(ReplCommand::Event(SessionEvent::Submit(format!(
            "/{}",
            escaped
        )))));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(ReplCommand::Event(SessionEvent::Submit(
            line.to_string(),
        ))));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let cmd = match name {
        "new" => ReplCommand::Event(SessionEvent::NewChat),
        "model" => {
            if rest.is_empty() {
                return Err(Error::invalid_argument("usage: /model <azure|llama2chat|phi3>"));
            }
            ReplCommand::Event(SessionEvent::SelectBackend(rest.parse::<BackendKind>()?))
        }
        "set" => {
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((field, value)) => (field, value.trim()),
                None => (rest, ""),
            };
            if field.is_empty() {
                return Err(Error::invalid_argument("usage: /set <field> [value]"));
            }
            ReplCommand::Event(SessionEvent::Configure {
                field: field.parse::<ConfigField>()?,
                value: value.to_string(),
            })
        }
        "show" => ReplCommand::Show,
        "history" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => {
            return Err(Error::invalid_argument(format!(
                "unknown command: /{} (try /help)",
                other
            )))
        }
    };
    Ok(Some(cmd))
}

/// `/show` の出力
#[derive(Debug, Serialize)]
struct ShowReport {
    backend: &'static str,
    status: &'static str,
    turns: usize,
    missing: Vec<&'static str>,
    settings: Value,
}

fn settings_json(config: &BackendConfig) -> Value {
    match config {
        BackendConfig::AzureOpenAi(c) => json!({
            "endpoint": c.endpoint,
            "api_version": c.api_version,
            "deployment": c.deployment,
            "temperature": c.temperature,
        }),
        BackendConfig::KaitoLlama2Chat(c) => json!({
            "endpoint": c.endpoint,
            "temperature": c.temperature,
            "system_message": c.system_message,
        }),
        BackendConfig::KaitoPhi3(c) => json!({
            "endpoint": c.endpoint,
            "temperature": c.temperature,
        }),
    }
}

fn write_show<W: Write>(out: &mut W, controller: &SessionController) -> Result<(), Error> {
    let config = controller.state().active_config();
    let report = ShowReport {
        backend: config.kind().display_name(),
        status: controller.status().as_str(),
        turns: controller.history().len(),
        missing: config.missing_fields().iter().map(|f| f.as_str()).collect(),
        settings: settings_json(&config),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

fn write_turns<W: Write>(out: &mut W, turns: &[RenderedTurn]) -> Result<(), Error> {
    for turn in turns {
        writeln!(out, "{}> {}", turn.speaker, turn.markdown)?;
    }
    Ok(())
}

fn write_help<W: Write>(out: &mut W) -> Result<(), Error> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  /new                    Start a new chat")?;
    writeln!(out, "  /model <variant>        Switch backend (azure, llama2chat, phi3)")?;
    writeln!(out, "  /set <field> [value]    Change a setting of the selected backend")?;
    writeln!(out, "                          fields: endpoint, api-version, deployment, temperature, system")?;
    writeln!(out, "  /show                   Show the selected backend and its settings")?;
    writeln!(out, "  /history                Print the conversation")?;
    writeln!(out, "  /help                   Show this help")?;
    writeln!(out, "  /quit                   Leave")?;
    writeln!(out, "Any other line is sent as a message. Start with // to send a line beginning with /.")?;
    Ok(())
}

fn write_notice<W: Write>(out: &mut W, notice: &Notice) -> Result<(), Error> {
    match notice {
        Notice::Warning(m) => writeln!(out, "warning: {}", m)?,
        Notice::Error(m) => writeln!(out, "error: {}", m)?,
    }
    Ok(())
}

/// 入力が尽きるか `/quit` まで対話を続ける
///
/// `prompt` が true のときだけ入力待ちのプロンプトを出す（端末から読む場合）。
pub fn run_repl<R: BufRead, W: Write>(
    controller: &mut SessionController,
    mut input: R,
    out: &mut W,
    prompt: bool,
) -> Result<(), Error> {
    write_turns(out, &controller.view().turns)?;
    loop {
        if prompt {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let command = match parse_line(&line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                continue;
            }
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => write_help(out)?,
            ReplCommand::Show => write_show(out, controller)?,
            ReplCommand::History => write_turns(out, &controller.view().turns)?,
            ReplCommand::Event(event) => {
                let submit = matches!(event, SessionEvent::Submit(_));
                let new_chat = matches!(event, SessionEvent::NewChat);
                let mut streamed = false;
                let view = {
                    let mut on_chunk = |chunk: &str| {
                        if !streamed {
                            let _ = write!(out, "assistant> ");
                            streamed = true;
                        }
                        let _ = write!(out, "{}", chunk);
                        let _ = out.flush();
                    };
                    controller.handle(event, &mut on_chunk)
                };
                if streamed {
                    writeln!(out)?;
                }
                if let Some(notice) = &view.notice {
                    write_notice(out, notice)?;
                } else if new_chat {
                    write_turns(out, &view.turns)?;
                } else if !submit {
                    writeln!(out, "backend: {} ({})", view.backend, view.status.as_str())?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(line: &str) -> SessionEvent {
        match parse_line(line).unwrap() {
            Some(ReplCommand::Event(e)) => e,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_plain_text_is_submit() {
        assert_eq!(
            event("Tell me a joke\n"),
            SessionEvent::Submit("Tell me a joke".to_string())
        );
    }

    #[test]
    fn test_parse_line_blank_is_none() {
        assert_eq!(parse_line("  \n").unwrap(), None);
    }

    #[test]
    fn test_parse_line_escaped_slash() {
        assert_eq!(
            event("//etc/hosts"),
            SessionEvent::Submit("/etc/hosts".to_string())
        );
    }

    #[test]
    fn test_parse_line_commands() {
        assert_eq!(event("/new"), SessionEvent::NewChat);
        assert_eq!(
            event("/model phi3"),
            SessionEvent::SelectBackend(BackendKind::KaitoPhi3)
        );
        assert_eq!(
            event("/model Kaito - Llama2Chat"),
            SessionEvent::SelectBackend(BackendKind::KaitoLlama2Chat)
        );
        assert_eq!(
            event("/set system Answer in one sentence"),
            SessionEvent::Configure {
                field: ConfigField::SystemMessage,
                value: "Answer in one sentence".to_string(),
            }
        );
        assert_eq!(
            event("/set endpoint"),
            SessionEvent::Configure {
                field: ConfigField::Endpoint,
                value: String::new(),
            }
        );
        assert_eq!(parse_line("/show").unwrap(), Some(ReplCommand::Show));
        assert_eq!(parse_line("/history").unwrap(), Some(ReplCommand::History));
        assert_eq!(parse_line("/help").unwrap(), Some(ReplCommand::Help));
        assert_eq!(parse_line("/exit").unwrap(), Some(ReplCommand::Quit));
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(parse_line("/model").is_err());
        assert!(parse_line("/model gemini").is_err());
        assert!(parse_line("/set").is_err());
        assert!(parse_line("/set colour blue").is_err());
        assert!(parse_line("/frobnicate").is_err());
    }
}
