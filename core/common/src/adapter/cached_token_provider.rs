//! スコープごとにトークンを保持し、期限が近づいたら取り直す TokenProvider

use crate::error::Error;
use crate::ports::outbound::{AccessToken, Clock, TokenProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 期限のこの秒数前から更新する
pub const REFRESH_MARGIN_SECS: i64 = 300;

pub struct CachedTokenProvider {
    inner: Arc<dyn TokenProvider>,
    clock: Arc<dyn Clock>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl CachedTokenProvider {
    pub fn new(inner: Arc<dyn TokenProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            clock,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, token: &AccessToken) -> bool {
        match token.expires_on {
            Some(exp) => exp - REFRESH_MARGIN_SECS > self.clock.now_secs(),
            None => true,
        }
    }
}

impl TokenProvider for CachedTokenProvider {
    fn get_token(&self, scope: &str) -> Result<AccessToken, Error> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| Error::provider_auth("token cache lock poisoned"))?;
        if let Some(token) = cache.get(scope) {
            if self.is_fresh(token) {
                return Ok(token.clone());
            }
        }
        let token = self.inner.get_token(scope)?;
        cache.insert(scope.to_string(), token.clone());
        Ok(token)
    }
}
