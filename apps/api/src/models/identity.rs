use serde::{Deserialize, Serialize};

/// The principal behind a bearer token, resolved per request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: String,
    pub email: Option<String>,
}

/// Session issued by the identity provider on login, refresh or sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: serde_json::Value,
}
