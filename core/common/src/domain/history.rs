//! 会話履歴のドメイン型
//!
//! 先頭は常に system の挨拶メッセージ。以降は呼び出し側が user / assistant の順に追記する。
//! 個別の削除・変更はできず、破壊的操作は `reset` による全体の作り直しのみ。

use super::Turn;

/// 新しい会話の先頭に置く挨拶
pub const GREETING: &str = "How can I help you today?";

/// 会話履歴
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// 挨拶の system メッセージ 1 件だけを持つ履歴を作る
    pub fn new() -> Self {
        Self {
            turns: vec![Turn::system(GREETING)],
        }
    }

    /// 履歴を `[system]` に戻す
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// 挿入順で走査する。Clone すれば何度でも先頭からやり直せる。
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            inner: self.turns.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// 最も新しい user メッセージ
    pub fn last_user(&self) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role() == super::Role::User)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// `History::snapshot` が返す遅延イテレータ
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    inner: std::slice::Iter<'a, Turn>,
}

impl<'a> Iterator for Snapshot<'a> {
    type Item = &'a Turn;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Snapshot<'_> {}
