//! Azure CLI (`az account get-access-token`) からトークンを取る TokenProvider

use crate::error::Error;
use crate::ports::outbound::{AccessToken, Process, TokenProvider};
use chrono::{Local, NaiveDateTime, TimeZone};
use serde_json::Value;
use std::sync::Arc;

/// スコープ末尾の `/.default` を外してリソース URI にする
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

pub struct AzureCliTokenProvider {
    process: Arc<dyn Process>,
    program: String,
}

impl AzureCliTokenProvider {
    pub fn new(process: Arc<dyn Process>) -> Self {
        Self {
            process,
            program: "az".to_string(),
        }
    }
}

impl TokenProvider for AzureCliTokenProvider {
    fn get_token(&self, scope: &str) -> Result<AccessToken, Error> {
        let resource = scope_to_resource(scope);
        let output = self
            .process
            .output(
                &self.program,
                &["account", "get-access-token", "--output", "json", "--resource", resource],
            )
            .map_err(|e| Error::provider_auth(format!("Azure CLI not available: {}", e)))?;
        if output.code != 0 {
            return Err(Error::provider_auth(format!(
                "Azure CLI exited with {}: {}",
                output.code,
                output.stderr.trim()
            )));
        }
        parse_cli_token(&output.stdout)
    }
}

/// `az account get-access-token` の出力を解釈する。
/// 新しい CLI は `expires_on`（epoch 秒）を、古い CLI はローカル時刻の `expiresOn` のみを返す。
pub fn parse_cli_token(stdout: &str) -> Result<AccessToken, Error> {
    let v: Value = serde_json::from_str(stdout)
        .map_err(|e| Error::provider_auth(format!("Failed to parse Azure CLI output: {}", e)))?;
    let token = v["accessToken"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::provider_auth("Azure CLI output has no accessToken"))?;

    let expires_on = v["expires_on"]
        .as_i64()
        .or_else(|| v["expiresOn"].as_str().and_then(parse_local_datetime));
    Ok(AccessToken::new(token, expires_on))
}

fn parse_local_datetime(s: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::ProcessOutput;
    use std::sync::Mutex;

    struct FakeProcess {
        output: ProcessOutput,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Process for FakeProcess {
        fn output(&self, program: &str, args: &[&str]) -> Result<ProcessOutput, Error> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|s| s.to_string()));
            self.calls.lock().unwrap().push(call);
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_scope_to_resource() {
        assert_eq!(
            scope_to_resource("https://cognitiveservices.azure.com/.default"),
            "https://cognitiveservices.azure.com"
        );
        assert_eq!(scope_to_resource("api://x"), "api://x");
    }

    #[test]
    fn test_parse_cli_token_with_epoch() {
        let t = parse_cli_token(r#"{"accessToken":"abc","expires_on":1700000000}"#).unwrap();
        assert_eq!(t.token, "abc");
        assert_eq!(t.expires_on, Some(1_700_000_000));
    }

    #[test]
    fn test_parse_cli_token_with_local_datetime() {
        let t = parse_cli_token(r#"{"accessToken":"abc","expiresOn":"2030-01-01 00:00:00.000000"}"#)
            .unwrap();
        assert!(t.expires_on.unwrap() > 1_800_000_000);
    }

    #[test]
    fn test_parse_cli_token_missing_token() {
        assert!(matches!(
            parse_cli_token(r#"{"expires_on":1}"#),
            Err(Error::ProviderAuth(_))
        ));
        assert!(matches!(parse_cli_token("not json"), Err(Error::ProviderAuth(_))));
    }

    #[test]
    fn test_cli_invocation_and_failure() {
        let fake = Arc::new(FakeProcess {
            output: ProcessOutput {
                code: 1,
                stdout: String::new(),
                stderr: "Please run 'az login'\n".to_string(),
            },
            calls: Mutex::new(Vec::new()),
        });
        let p = AzureCliTokenProvider::new(fake.clone());
        let err = p
            .get_token("https://cognitiveservices.azure.com/.default")
            .unwrap_err();
        assert_eq!(
            err,
            Error::provider_auth("Azure CLI exited with 1: Please run 'az login'")
        );
        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0][0], "az");
        assert_eq!(calls[0].last().unwrap(), "https://cognitiveservices.azure.com");
    }
}
