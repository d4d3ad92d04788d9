//! 複数の TokenProvider を順に試し、最初に成功したものを使う

use crate::error::Error;
use crate::ports::outbound::{AccessToken, TokenProvider};
use std::sync::Arc;

pub struct ChainedTokenProvider {
    providers: Vec<(String, Arc<dyn TokenProvider>)>,
}

impl ChainedTokenProvider {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, provider: Arc<dyn TokenProvider>) -> Self {
        self.providers.push((name.to_string(), provider));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Default for ChainedTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenProvider for ChainedTokenProvider {
    fn get_token(&self, scope: &str) -> Result<AccessToken, Error> {
        let mut failures = Vec::new();
        for (name, provider) in &self.providers {
            match provider.get_token(scope) {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(format!("{}: {}", name, e)),
            }
        }
        if failures.is_empty() {
            return Err(Error::provider_auth("no credential provider configured"));
        }
        Err(Error::provider_auth(format!(
            "no credential available ({})",
            failures.join("; ")
        )))
    }
}
