//! Outbound ポート: アプリが外界（HTTP・資格情報・プロセス・時刻・環境変数・ログ）を使うための trait

pub mod clock;
pub mod env_resolver;
pub mod http;
pub mod log;
pub mod process;
pub mod token;

pub use clock::Clock;
pub use env_resolver::EnvResolver;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use log::{now_iso8601, Log, LogLevel, LogRecord};
pub use process::{Process, ProcessOutput};
pub use token::{AccessToken, TokenProvider};
