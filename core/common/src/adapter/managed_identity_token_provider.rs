//! マネージド ID（インスタンスメタデータサービス）からトークンを取る TokenProvider
//!
//! Azure 外のホストでは接続が応答しないことがあるため、
//! 短いタイムアウトを持つ専用の HttpTransport を渡すこと。

use crate::adapter::azure_cli_token_provider::scope_to_resource;
use crate::error::Error;
use crate::ports::outbound::{AccessToken, HttpRequest, HttpTransport, TokenProvider};
use serde_json::Value;
use std::sync::Arc;

pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

pub struct ManagedIdentityTokenProvider {
    http: Arc<dyn HttpTransport>,
    endpoint: String,
    /// ユーザー割り当てマネージド ID のクライアント ID
    client_id: Option<String>,
}

impl ManagedIdentityTokenProvider {
    pub fn new(http: Arc<dyn HttpTransport>, client_id: Option<String>) -> Self {
        Self {
            http,
            endpoint: IMDS_TOKEN_ENDPOINT.to_string(),
            client_id,
        }
    }

    fn token_url(&self, resource: &str) -> Result<String, Error> {
        let mut params = vec![("api-version", IMDS_API_VERSION), ("resource", resource)];
        if let Some(id) = &self.client_id {
            params.push(("client_id", id.as_str()));
        }
        reqwest::Url::parse_with_params(&self.endpoint, &params)
            .map(|u| u.to_string())
            .map_err(|e| Error::provider_auth(format!("invalid identity endpoint: {}", e)))
    }
}

impl TokenProvider for ManagedIdentityTokenProvider {
    fn get_token(&self, scope: &str) -> Result<AccessToken, Error> {
        let url = self.token_url(scope_to_resource(scope))?;
        let request = HttpRequest::get(url).with_header("Metadata", "true");
        let response = self
            .http
            .send(&request)
            .map_err(|e| Error::provider_auth(format!("managed identity unavailable: {}", e)))?;
        if !response.is_success() {
            return Err(Error::provider_auth(format!(
                "managed identity returned HTTP {}: {}",
                response.status, response.body
            )));
        }
        parse_imds_token(&response.body)
    }
}

/// IMDS のレスポンスを解釈する（`expires_on` は文字列の epoch 秒）
pub fn parse_imds_token(body: &str) -> Result<AccessToken, Error> {
    let v: Value = serde_json::from_str(body).map_err(|e| {
        Error::provider_auth(format!("Failed to parse managed identity response: {}", e))
    })?;
    let token = v["access_token"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::provider_auth("managed identity response has no access_token"))?;
    let expires_on = match &v["expires_on"] {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    Ok(AccessToken::new(token, expires_on))
}
