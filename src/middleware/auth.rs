// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::AppState};

// Os tokens são emitidos pelo serviço de login; aqui só validamos
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Operador autenticado, disponível nos handlers protegidos.
#[derive(Debug, Clone)]
pub struct AuthenticatedOperator(pub String);

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

    Ok(token_data.claims)
}

// O middleware em si
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;
    let claims = validate_token(bearer.token(), &app_state.jwt_secret)?;

    // Insere o operador nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedOperator(claims.sub));
    Ok(next.run(request).await)
}

// Extrator para obter o operador autenticado diretamente nos handlers
impl<S> FromRequestParts<S> for AuthenticatedOperator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedOperator>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
