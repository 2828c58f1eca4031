use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use gate_common::{GroupId, UserId};
use http::{HeaderMap, StatusCode};
use uuid::Uuid;

/// The caller identity resolved from the request, on the success path of
/// the Identity Resolver stage.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user_id: Option<UserId>,
    pub api_key_id: Option<Uuid>,
    pub group_id: Option<GroupId>,
    /// The user's own concurrency ceiling, resolved alongside identity so
    /// the Concurrency Controller doesn't need a second lookup.
    pub user_concurrency_cap: u32,
    pub api_key_concurrency_cap: Option<u32>,
}

#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl AuthError {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

pub trait AuthProvider: Send + Sync {
    #[allow(clippy::result_large_err)]
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError>;
}

#[derive(Debug, Default)]
pub struct NoopAuth;

impl AuthProvider for NoopAuth {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        Ok(AuthContext::default())
    }
}

#[derive(Debug, Clone)]
pub struct AuthKeyEntry {
    pub key_id: Uuid,
    pub user_id: UserId,
    pub group_id: Option<GroupId>,
    pub concurrency_cap: Option<u32>,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct UserEntry {
    pub id: UserId,
    pub concurrency_cap: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub keys_by_value: HashMap<String, AuthKeyEntry>,
    pub users_by_id: HashMap<UserId, UserEntry>,
}

/// In-memory identity resolver, fed from the same `TenantSnapshot` that
/// feeds `gate_core::state::AppState`. Real deployments wire a different
/// `AuthProvider` against whatever issues/validates API keys; this one
/// exists so the rest of the pipeline can be exercised without one.
#[derive(Debug)]
pub struct MemoryAuth {
    snapshot: ArcSwap<AuthSnapshot>,
}

impl MemoryAuth {
    pub fn new(snapshot: AuthSnapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn replace_snapshot(&self, snapshot: AuthSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }
}

impl AuthProvider for MemoryAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let api_key = extract_api_key(headers)
            .ok_or_else(|| AuthError::new(StatusCode::UNAUTHORIZED, "missing api key"))?;

        let snapshot = self.snapshot.load();
        let entry = snapshot
            .keys_by_value
            .get(api_key.as_str())
            .ok_or_else(|| AuthError::new(StatusCode::FORBIDDEN, "invalid api key"))?;

        if !entry.enabled {
            return Err(AuthError::new(StatusCode::FORBIDDEN, "api key disabled"));
        }

        let user = snapshot.users_by_id.get(&entry.user_id);
        let user_enabled = user.map(|u| u.enabled).unwrap_or(false);
        if !user_enabled {
            return Err(AuthError::new(StatusCode::FORBIDDEN, "user disabled"));
        }

        Ok(AuthContext {
            user_id: Some(entry.user_id),
            api_key_id: Some(entry.key_id),
            group_id: entry.group_id,
            user_concurrency_cap: user.map(|u| u.concurrency_cap).unwrap_or(1),
            api_key_concurrency_cap: entry.concurrency_cap,
        })
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = header_value(headers, "x-api-key") {
        return Some(value);
    }

    let auth = header_value(headers, "authorization")?;
    let auth = auth.trim();
    if let Some(token) = auth.strip_prefix("Bearer ") {
        return Some(token.trim().to_string());
    }
    if let Some(token) = auth.strip_prefix("bearer ") {
        return Some(token.trim().to_string());
    }
    None
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(name: &str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            http::HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    fn sample_snapshot() -> AuthSnapshot {
        let user_id = UserId::new();
        let key_id = Uuid::new_v4();
        let mut keys_by_value = HashMap::new();
        keys_by_value.insert(
            "sk-test".to_string(),
            AuthKeyEntry {
                key_id,
                user_id,
                group_id: None,
                concurrency_cap: None,
                enabled: true,
            },
        );
        let mut users_by_id = HashMap::new();
        users_by_id.insert(
            user_id,
            UserEntry {
                id: user_id,
                concurrency_cap: 4,
                enabled: true,
            },
        );
        AuthSnapshot {
            keys_by_value,
            users_by_id,
        }
    }

    #[test]
    fn bearer_token_and_x_api_key_both_resolve() {
        let auth = MemoryAuth::new(sample_snapshot());
        let ctx = auth
            .authenticate(&headers_with("x-api-key", "sk-test"))
            .unwrap();
        assert!(ctx.user_id.is_some());

        let ctx2 = auth
            .authenticate(&headers_with("authorization", "Bearer sk-test"))
            .unwrap();
        assert_eq!(ctx.user_id, ctx2.user_id);
    }

    #[test]
    fn missing_key_is_unauthorized() {
        let auth = MemoryAuth::new(sample_snapshot());
        let err = auth.authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unknown_key_is_forbidden() {
        let auth = MemoryAuth::new(sample_snapshot());
        let err = auth
            .authenticate(&headers_with("x-api-key", "sk-unknown"))
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
