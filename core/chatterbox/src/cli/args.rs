use clap::builder::ArgAction;
use clap::value_parser;
use clap_complete::Shell;
use common::config::SessionDefaults;
use common::domain::{BackendKind, ConfigField};
use common::error::Error;
use std::time::Duration;

/// コマンドラインで指定された上書き値
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// -v / --verbose: 構造化ログを stderr にも出す
    pub verbose: bool,
    /// -m / --model-source: 起動時のバックエンド
    pub model_source: Option<BackendKind>,
    /// 選択中バックエンドのエンドポイント（Kaito の 2 種類は共有）
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,
    /// Llama2Chat の system メッセージ
    pub system: Option<String>,
    pub temperature: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<String>,
}

impl Config {
    /// 環境変数由来の既定値にコマンドラインの値を重ねる
    pub fn apply_to(&self, defaults: &mut SessionDefaults) -> Result<(), Error> {
        if let Some(kind) = self.model_source {
            defaults.selected = kind;
        }
        let settings = &mut defaults.settings;
        if let Some(endpoint) = &self.endpoint {
            match defaults.selected {
                BackendKind::AzureOpenAi => {
                    settings.set(BackendKind::AzureOpenAi, ConfigField::Endpoint, endpoint)?
                }
                BackendKind::KaitoLlama2Chat | BackendKind::KaitoPhi3 => {
                    settings.set(BackendKind::KaitoLlama2Chat, ConfigField::Endpoint, endpoint)?;
                    settings.set(BackendKind::KaitoPhi3, ConfigField::Endpoint, endpoint)?;
                }
            }
        }
        if let Some(v) = &self.api_version {
            settings.set(BackendKind::AzureOpenAi, ConfigField::ApiVersion, v)?;
        }
        if let Some(v) = &self.deployment {
            settings.set(BackendKind::AzureOpenAi, ConfigField::Deployment, v)?;
        }
        if let Some(v) = &self.system {
            settings.set(BackendKind::KaitoLlama2Chat, ConfigField::SystemMessage, v)?;
        }
        if let Some(v) = &self.temperature {
            for kind in BackendKind::ALL {
                settings.set(kind, ConfigField::Temperature, v)?;
            }
        }
        if let Some(secs) = self.timeout_secs {
            defaults.http_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = &self.log_file {
            defaults.log_file = Some(path.clone());
        }
        Ok(())
    }
}

/// 解析結果: 通常の Config / 補完スクリプト生成 / ヘルプ表示
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Config(Config),
    GenerateCompletion(Shell),
    /// --help / --version（clap が整形した文面）
    Help(String),
}

pub(crate) fn build_clap_command() -> clap::Command {
    clap::Command::new("chatterbox")
        .about("Chat with Azure OpenAI or a Kaito model endpoint from the terminal")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Emit structured logs to stderr (for troubleshooting)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("model-source")
                .short('m')
                .long("model-source")
                .value_name("variant")
                .help("Backend to start with: azure, llama2chat or phi3 [env: SELECTED_MODEL]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("endpoint")
                .short('e')
                .long("endpoint")
                .value_name("url")
                .help("Endpoint of the selected backend [env: AZURE_OPENAI_ENDPOINT / MODEL_ENDPOINT]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("api-version")
                .long("api-version")
                .value_name("version")
                .help("Azure OpenAI API version [env: AZURE_OPENAI_API_VERSION]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("deployment")
                .short('d')
                .long("deployment")
                .value_name("name")
                .help("Azure OpenAI deployment name [env: AZURE_OPENAI_MODEL_DEPLOYMENT_NAME]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("system")
                .short('S')
                .long("system")
                .value_name("message")
                .help("System message for Kaito Llama2Chat [env: SYSTEM_MESSAGE]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("temperature")
                .short('t')
                .long("temperature")
                .value_name("value")
                .help("Sampling temperature, clamped to 0.0..=1.0 [env: CHATTERBOX_TEMPERATURE]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("timeout")
                .long("timeout")
                .value_name("secs")
                .help("HTTP timeout in seconds [env: CHATTERBOX_HTTP_TIMEOUT_SECS]")
                .value_parser(value_parser!(u64).range(1..))
                .num_args(1),
        )
        .arg(
            clap::Arg::new("log-file")
                .long("log-file")
                .value_name("path")
                .help("Append JSONL logs to this file [env: CHATTERBOX_LOG_FILE]")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("completion")
                .long("completion")
                .value_name("shell")
                .help("Generate shell completion script")
                .value_parser(value_parser!(Shell))
                .num_args(1),
        )
}

fn matches_to_config(matches: &clap::ArgMatches) -> Result<Config, Error> {
    let model_source = matches
        .get_one::<String>("model-source")
        .map(|s| s.parse::<BackendKind>())
        .transpose()?;
    let string = |id: &str| matches.get_one::<String>(id).cloned();

    Ok(Config {
        verbose: matches.get_flag("verbose"),
        model_source,
        endpoint: string("endpoint"),
        api_version: string("api-version"),
        deployment: string("deployment"),
        system: string("system"),
        temperature: string("temperature"),
        timeout_secs: matches.get_one::<u64>("timeout").copied(),
        log_file: string("log-file"),
    })
}

fn parse_matches(
    result: Result<clap::ArgMatches, clap::Error>,
) -> Result<ParseOutcome, Error> {
    let matches = match result {
        Ok(m) => m,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            return Ok(ParseOutcome::Help(e.to_string()));
        }
        Err(e) => return Err(Error::invalid_argument(e.to_string())),
    };

    if let Some(&shell) = matches.get_one::<Shell>("completion") {
        return Ok(ParseOutcome::GenerateCompletion(shell));
    }
    Ok(ParseOutcome::Config(matches_to_config(&matches)?))
}

/// コマンドラインを解析する
pub fn parse_args() -> Result<ParseOutcome, Error> {
    parse_matches(build_clap_command().try_get_matches())
}

/// テスト用: 引数スライスから解析する
#[allow(dead_code)]
pub fn parse_args_from(args: &[&str]) -> Result<ParseOutcome, Error> {
    parse_matches(build_clap_command().try_get_matches_from(args))
}

/// 補完スクリプトを標準出力に出力する
pub fn print_completion(shell: Shell) {
    let mut cmd = build_clap_command();
    clap_complete::generate(shell, &mut cmd, "chatterbox", &mut std::io::stdout());
}
