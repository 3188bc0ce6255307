//! Identity provider client (Supabase GoTrue-compatible).
//!
//! Token validation is the only call on the analysis path; the session calls
//! back the `/auth` account endpoints.
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::SupabaseConfig;
use crate::models::identity::{CallerIdentity, Session};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("identity provider returned an unexpected body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("identity provider is not configured")]
    Unavailable,
}

/// Outcome of a sign-up. Without email auto-confirmation there is no session yet.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: Value,
    pub session: Option<Session>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the provider does not recognise the token.
    async fn resolve(&self, token: &str) -> Result<Option<CallerIdentity>, IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Registration, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError>;

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Option<String>,
    email: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseIdentityProvider {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseIdentityProvider {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()?,
            base_url: format!("{}/auth/v1", config.url),
            anon_key: config.anon_key.clone(),
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    async fn session_call(&self, grant_type: &str, body: Value) -> Result<Session, IdentityError> {
        let response = self
            .request(
                self.client
                    .post(format!("{}/token", self.base_url))
                    .query(&[("grant_type", grant_type)])
                    .json(&body),
            )
            .send()
            .await?;
        let body = checked_json(response).await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Option<CallerIdentity>, IdentityError> {
        let response = self
            .request(
                self.client
                    .get(format!("{}/user", self.base_url))
                    .bearer_auth(token),
            )
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            debug!(status = status.as_u16(), "Identity provider rejected token");
            return Ok(None);
        }
        let user: ProviderUser = serde_json::from_value(checked_json(response).await?)?;
        Ok(user.id.map(|id| CallerIdentity {
            id,
            email: user.email,
        }))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Registration, IdentityError> {
        let response = self
            .request(self.client.post(format!("{}/signup", self.base_url)).json(&json!({
                "email": email,
                "password": password,
                "data": {
                    "full_name": full_name.unwrap_or_default(),
                    "created_at": chrono::Utc::now().to_rfc3339(),
                }
            })))
            .send()
            .await?;
        let body = checked_json(response).await?;

        // With auto-confirm the provider answers with a session, otherwise with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            Ok(Registration {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            Ok(Registration {
                user: body,
                session: None,
            })
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        self.session_call("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        self.session_call("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let response = self
            .request(
                self.client
                    .post(format!("{}/logout", self.base_url))
                    .bearer_auth(token),
            )
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                message: provider_message(&text),
            });
        }
        Ok(())
    }
}

/// Used when no provider credentials are configured: no token ever resolves.
pub struct UnconfiguredIdentityProvider;

#[async_trait]
impl IdentityProvider for UnconfiguredIdentityProvider {
    async fn resolve(&self, _: &str) -> Result<Option<CallerIdentity>, IdentityError> {
        Ok(None)
    }

    async fn sign_up(&self, _: &str, _: &str, _: Option<&str>) -> Result<Registration, IdentityError> {
        Err(IdentityError::Unavailable)
    }

    async fn sign_in(&self, _: &str, _: &str) -> Result<Session, IdentityError> {
        Err(IdentityError::Unavailable)
    }

    async fn refresh(&self, _: &str) -> Result<Session, IdentityError> {
        Err(IdentityError::Unavailable)
    }

    async fn sign_out(&self, _: &str) -> Result<(), IdentityError> {
        Err(IdentityError::Unavailable)
    }
}

async fn checked_json(response: Response) -> Result<Value, IdentityError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(IdentityError::Rejected {
            status: status.as_u16(),
            message: provider_message(&text),
        });
    }
    Ok(serde_json::from_str(&text)?)
}

/// GoTrue reports errors under a few different keys depending on the endpoint.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| body.to_string())
}
