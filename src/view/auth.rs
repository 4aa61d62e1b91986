//! Auth view-model and route guard.

use super::ActionOutcome;
use crate::auth::{AuthState, AuthStore};
use crate::models::{LoginInput, RegisterInput, User};

/// Where unauthenticated callers are sent.
pub const LOGIN_ROUTE: &str = "/login";

/// Decision of [`AuthView::guard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthGuard {
    /// Still reading the persisted session
    Pending,
    Render,
    Redirect(&'static str),
}

#[derive(Debug, Clone)]
pub struct AuthView {
    store: AuthStore,
}

impl AuthView {
    /// Build the view, reading the persisted session first.
    pub fn new(store: AuthStore) -> Self {
        if !store.snapshot().hydrated {
            store.hydrate();
        }
        Self { store }
    }

    pub fn state(&self) -> AuthState {
        self.store.snapshot()
    }

    pub fn is_hydrated(&self) -> bool {
        self.store.snapshot().hydrated
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        let state = self.store.snapshot();
        !state.hydrated || state.loading
    }

    pub fn user(&self) -> Option<User> {
        self.store.snapshot().user
    }

    pub fn guard(&self) -> AuthGuard {
        if self.is_loading() {
            AuthGuard::Pending
        } else if self.is_authenticated() {
            AuthGuard::Render
        } else {
            AuthGuard::Redirect(LOGIN_ROUTE)
        }
    }

    pub async fn login(&self, input: &LoginInput) -> ActionOutcome<()> {
        ActionOutcome::from_result(self.store.login(input).await, "Erro ao logar")
    }

    pub async fn register(&self, input: &RegisterInput) -> ActionOutcome<()> {
        ActionOutcome::from_result(self.store.register(input).await, "Erro ao cadastrar")
    }

    pub fn logout(&self) -> ActionOutcome<()> {
        ActionOutcome::from_result(self.store.logout(), "Erro ao sair")
    }
}
