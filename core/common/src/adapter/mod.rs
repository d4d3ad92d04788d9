//! アダプター（outbound ポートの標準実装）
//!
//! セッションとバックエンドアダプタはポートの trait 経由でのみ HTTP・プロセス・時刻・ログに触れる。
//! ここには標準実装（Std* / Reqwest*）と、テストや組み込みで使う固定値実装を置く。

pub mod azure_cli_token_provider;
pub mod cached_token_provider;
pub mod chained_token_provider;
pub mod env_token_provider;
pub mod file_json_log;
pub mod managed_identity_token_provider;
pub mod reqwest_transport;
pub mod spy_transport;
pub mod std_clock;
pub mod std_env_resolver;
pub mod std_process;

pub use azure_cli_token_provider::AzureCliTokenProvider;
pub use cached_token_provider::CachedTokenProvider;
pub use chained_token_provider::ChainedTokenProvider;
pub use env_token_provider::{EnvTokenProvider, StaticTokenProvider, DEFAULT_TOKEN_ENV};
pub use file_json_log::{FileJsonLog, NoopLog, StderrLog, TeeLog};
pub use managed_identity_token_provider::ManagedIdentityTokenProvider;
pub use reqwest_transport::{ReqwestTransport, DEFAULT_TIMEOUT};
pub use spy_transport::SpyTransport;
pub use std_clock::{FixedClock, StdClock};
pub use std_env_resolver::{MapEnvResolver, StdEnvResolver};
pub use std_process::StdProcess;
