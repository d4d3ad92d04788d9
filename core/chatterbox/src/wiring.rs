//! 配線: 標準アダプタでセッションを組み立てる

use std::sync::Arc;
use std::time::Duration;

use common::adapter::{
    AzureCliTokenProvider, CachedTokenProvider, ChainedTokenProvider, EnvTokenProvider,
    FileJsonLog, ManagedIdentityTokenProvider, NoopLog, ReqwestTransport, StderrLog, StdClock,
    StdEnvResolver, StdProcess, TeeLog, DEFAULT_TOKEN_ENV,
};
use common::config::SessionDefaults;
use common::error::Error;
use common::llm::{BackendDeps, BackendFactory, StdBackendFactory};
use common::ports::outbound::{EnvResolver, HttpTransport, Log, LogLevel, Process, TokenProvider};
use common::session::{SessionController, SessionState};

/// IMDS は VM 外では応答しないので短く切る
const IMDS_TIMEOUT: Duration = Duration::from_secs(2);

/// ユーザー割り当てマネージド ID のクライアント ID
const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";

/// main が使う部品一式
pub struct App {
    pub factory: Arc<dyn BackendFactory>,
    pub log: Arc<dyn Log>,
}

impl App {
    /// 既定値から新しいセッションを作る
    pub fn start_session(&self, defaults: &SessionDefaults) -> SessionController {
        SessionController::new(
            SessionState::create(defaults),
            Arc::clone(&self.factory),
            Arc::clone(&self.log),
        )
    }
}

/// ログ出力先を組み立てる
///
/// `-v` で stderr に debug まで、ログファイル指定で JSONL を追記する。どちらもなければ捨てる。
pub fn build_log(verbose: bool, log_file: Option<&str>) -> Arc<dyn Log> {
    let mut sinks: Vec<Box<dyn Log>> = Vec::new();
    if let Some(path) = log_file {
        sinks.push(Box::new(FileJsonLog::new(path)));
    }
    if verbose {
        sinks.push(Box::new(StderrLog::new(LogLevel::Debug)));
    }
    match sinks.len() {
        0 => Arc::new(NoopLog),
        1 => match sinks.pop() {
            Some(only) => Arc::from(only),
            None => Arc::new(NoopLog),
        },
        _ => Arc::new(TeeLog::new(sinks)),
    }
}

/// Bearer トークンの取得順: 環境変数 → Azure CLI → マネージド ID。結果はキャッシュする。
pub fn build_token_provider(
    env: Arc<dyn EnvResolver>,
    process: Arc<dyn Process>,
    imds_http: Arc<dyn HttpTransport>,
) -> Arc<dyn TokenProvider> {
    let client_id = env.var(ENV_CLIENT_ID);
    let chain = ChainedTokenProvider::new()
        .with("env", Arc::new(EnvTokenProvider::new(Arc::clone(&env), DEFAULT_TOKEN_ENV)))
        .with("azure-cli", Arc::new(AzureCliTokenProvider::new(process)))
        .with(
            "managed-identity",
            Arc::new(ManagedIdentityTokenProvider::new(imds_http, client_id)),
        );
    Arc::new(CachedTokenProvider::new(Arc::new(chain), Arc::new(StdClock)))
}

/// 配線: 標準アダプタで App を組み立てる
pub fn wire_app(verbose: bool, defaults: &SessionDefaults) -> Result<App, Error> {
    let log = build_log(verbose, defaults.log_file.as_deref());
    let http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(defaults.http_timeout)?);
    let imds_http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(IMDS_TIMEOUT)?);
    let tokens = build_token_provider(Arc::new(StdEnvResolver), Arc::new(StdProcess), imds_http);
    let factory = Arc::new(StdBackendFactory::new(BackendDeps { http, tokens }));
    Ok(App { factory, log })
}
