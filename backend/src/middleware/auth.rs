//! JWT authentication and role/permission gating. Admins implicitly
//! pass every permission check; workers are gated by the capability
//! set carried in their token claims.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use shared::models::{Capability, PermissionSet, Role, Section, Subsection};

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated caller, decoded from the access token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl AuthUser {
    pub fn can_access(&self, section: Section) -> bool {
        self.role == Role::Admin || self.permissions.allows(Capability::section(section))
    }

    pub fn can_access_child(&self, section: Section, subsection: Subsection) -> bool {
        self.role == Role::Admin
            || self
                .permissions
                .allows(Capability::child(section, subsection))
    }
}

/// Token claims shared with `AuthService` for minting.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Why a presented token was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenRejection {
    Expired,
    Invalid(&'static str),
}

/// Decode and validate a Bearer token against the signing secret,
/// producing the authenticated caller. Minting (`AuthService`) and
/// verification must use the same `config.jwt.secret`.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, TokenRejection> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        _ => TokenRejection::Invalid("Invalid token"),
    })?
    .claims;

    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| TokenRejection::Invalid("Invalid user id in token"))?;
    let role: Role = claims
        .role
        .parse()
        .map_err(|_| TokenRejection::Invalid("Invalid role in token"))?;
    let permissions = PermissionSet::from_keys(&claims.permissions)
        .map_err(|_| TokenRejection::Invalid("Invalid permissions in token"))?;

    Ok(AuthUser {
        user_id,
        role,
        permissions,
    })
}

/// Validates the Bearer token with the configured secret and stashes
/// an [`AuthUser`] in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = match bearer {
        Some(token) => token,
        None => return reject("UNAUTHORIZED", "Missing or invalid Authorization header"),
    };

    let auth_user = match verify_token(token, &state.config.jwt.secret) {
        Ok(user) => user,
        Err(TokenRejection::Expired) => return reject("TOKEN_EXPIRED", "Token has expired"),
        Err(TokenRejection::Invalid(message)) => return reject("UNAUTHORIZED", message),
    };

    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

fn reject(code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
            field: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Handler extractor for the authenticated user.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let body = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message: "Authentication required".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(body))
            })
    }
}
