//! サブプロセス実行 Outbound ポート
//!
//! Azure CLI からのトークン取得など、外部コマンドの標準出力を使う処理を trait で抽象化する。

use crate::error::Error;

/// サブプロセスの実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// サブプロセス実行の抽象
///
/// 実装は `common::adapter::StdProcess`（std::process::Command）など。
pub trait Process: Send + Sync {
    /// プログラムを引数付きで実行し、終了コードと出力を返す。
    /// 起動自体に失敗した場合のみ Err。
    fn output(&self, program: &str, args: &[&str]) -> Result<ProcessOutput, Error>;
}
