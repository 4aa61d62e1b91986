//! Auth store: login, registration and logout against the API.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;

use super::{extract_token, token_from_blob, PersistedAuth};
use crate::api::ApiClient;
use crate::errors::{ClientError, ClientResult};
use crate::models::{LoginInput, RegisterInput, User};

/// Snapshot of the auth store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
    /// Set once the persisted blob has been read back.
    pub hydrated: bool,
}

/// Owns the session token. The token is mirrored into durable storage so
/// the request interceptor picks it up.
#[derive(Debug, Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

#[derive(Debug)]
struct AuthInner {
    client: ApiClient,
    state: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(AuthInner { client, state }),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.inner.state.borrow();
        state.hydrated && state.token.is_some()
    }

    /// Load token and user from storage into memory.
    pub fn hydrate(&self) {
        let raw = match self.inner.client.storage().load() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Could not read auth storage: {}", e);
                None
            }
        };

        let token = raw.as_deref().and_then(token_from_blob);
        let user = raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<PersistedAuth>(raw).ok())
            .and_then(|persisted| persisted.state.user);

        self.inner.state.send_modify(|state| {
            state.token = token;
            state.user = user;
            state.hydrated = true;
        });
    }

    /// POST the registration. A response without a token still counts as
    /// success; the user simply is not logged in yet.
    pub async fn register(&self, input: &RegisterInput) -> ClientResult<()> {
        input.validate()?;
        self.begin();

        let path = self.inner.client.endpoints().register.clone();
        let request = self
            .inner
            .client
            .request(Method::POST, &path)
            .json(&input.normalized());

        let result = async {
            let body: Value = self.inner.client.send_json(request).await?;
            match extract_token(&body) {
                Some(token) => self.commit_session(token, user_from(&body)),
                None => {
                    tracing::info!("Registered {} without a session token", input.email);
                    self.inner.state.send_modify(|state| state.loading = false);
                    Ok(())
                }
            }
        }
        .await;

        self.finish(result, "Erro ao cadastrar")
    }

    /// POST the credentials. Fails with [`ClientError::MissingToken`] when
    /// the response carries no token.
    pub async fn login(&self, input: &LoginInput) -> ClientResult<()> {
        self.begin();

        let path = self.inner.client.endpoints().login.clone();
        let request = self.inner.client.request(Method::POST, &path).json(input);

        let result = async {
            let body: Value = self.inner.client.send_json(request).await?;
            let token = extract_token(&body).ok_or_else(|| {
                tracing::warn!("Token not found in login response");
                ClientError::MissingToken
            })?;
            self.commit_session(token, user_from(&body))
        }
        .await;

        self.finish(result, "Erro ao logar")
    }

    /// Drop the session from memory and storage.
    pub fn logout(&self) -> ClientResult<()> {
        self.inner.state.send_modify(|state| {
            state.token = None;
            state.user = None;
            state.error = None;
        });
        self.inner.client.storage().clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    fn begin(&self) {
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn commit_session(&self, token: String, user: Option<User>) -> ClientResult<()> {
        let persisted = PersistedAuth::new(Some(token.clone()), user.clone());
        self.inner
            .client
            .storage()
            .save(&serde_json::to_string(&persisted)?)?;

        self.inner.state.send_modify(|state| {
            state.token = Some(token);
            if user.is_some() {
                state.user = user;
            }
            state.loading = false;
            state.hydrated = true;
        });
        Ok(())
    }

    fn finish(&self, result: ClientResult<()>, default_message: &str) -> ClientResult<()> {
        if let Err(err) = &result {
            let message = err.user_message_or(default_message);
            tracing::warn!("{}: {}", default_message, message);
            self.inner.state.send_modify(|state| {
                state.error = Some(message);
                state.loading = false;
            });
        }
        result
    }
}

fn user_from(body: &Value) -> Option<User> {
    body.get("user")
        .filter(|user| user.is_object())
        .and_then(|user| serde_json::from_value(user.clone()).ok())
}
