//! Account models used by login and registration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::ClientResult;

/// An authenticated user as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub email_status: String,
    #[serde(default)]
    pub platform_role: String,
    #[serde(default)]
    pub avatar: String,
}

/// Phone number split into its parts. Every part holds digits only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Phone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

impl Phone {
    /// Strip non-digits and clamp each part to its maximum length.
    pub fn sanitized(&self) -> Self {
        Self {
            country: self.country.as_deref().map(|s| digits(s, 3)),
            ddd: self.ddd.as_deref().map(|s| digits(s, 2)),
            number: self.number.as_deref().map(|s| digits(s, 9)),
        }
    }

    pub fn is_empty(&self) -> bool {
        [&self.country, &self.ddd, &self.number]
            .iter()
            .all(|part| part.as_deref().map_or(true, str::is_empty))
    }
}

fn digits(raw: &str, max: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Request body for `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "Senha é obrigatória"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "As senhas não coincidem"))]
    pub verify_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
}

impl RegisterInput {
    pub fn validate(&self) -> ClientResult<()> {
        Ok(Validate::validate(self)?)
    }

    /// Copy with a sanitized phone, dropping it entirely when empty.
    pub fn normalized(&self) -> Self {
        let phone = self
            .phone
            .as_ref()
            .map(Phone::sanitized)
            .filter(|p| !p.is_empty());
        Self {
            phone,
            ..self.clone()
        }
    }
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}
