//! 会話履歴の描画
//!
//! 画面の実描画はホスト側の責務。ここでは履歴のスナップショットから
//! 描画単位の列を作る純粋関数だけを提供する。

use crate::domain::{Role, Turn};

/// 1 メッセージ分の描画単位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    pub role: Role,
    /// 吹き出しの話者（system の挨拶は assistant 側に出す）
    pub speaker: &'static str,
    /// Markdown として表示する本文
    pub markdown: String,
}

pub fn render<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> Vec<RenderedTurn> {
    turns
        .into_iter()
        .map(|t| RenderedTurn {
            role: t.role(),
            speaker: match t.role() {
                Role::User => "user",
                Role::Assistant | Role::System => "assistant",
            },
            markdown: t.content().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::History;

    #[test]
    fn test_render_is_one_to_one_and_ordered() {
        let mut h = History::new();
        h.append(Turn::user("**hi**"));
        h.append(Turn::assistant("hello"));
        let view = render(h.snapshot());
        assert_eq!(view.len(), 3);
        assert_eq!(view[0].speaker, "assistant");
        assert_eq!(view[0].role, Role::System);
        assert_eq!(view[1].speaker, "user");
        assert_eq!(view[1].markdown, "**hi**");
        assert_eq!(view[2].speaker, "assistant");
    }

    #[test]
    fn test_render_does_not_touch_history() {
        let h = History::new();
        let before = h.clone();
        let _ = render(h.snapshot());
        let _ = render(h.snapshot());
        assert_eq!(h, before);
    }
}
