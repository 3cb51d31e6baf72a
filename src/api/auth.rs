//! Registration, login and the bearer-token gate.
//!
//! `auth_middleware` verifies the token and stores an [`AuthUser`] in the
//! request extensions; `admin_middleware` runs after it and requires the
//! ADMIN role. Handlers take `AuthUser` as an extractor.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use super::error::{is_unique_violation, ApiError, ValidationErrorBuilder};
use super::extract::ApiJson;
use super::validation::{validate_email, validate_password, validate_required};
use crate::crypto::{hash_password, verify_password};
use crate::db::{now_timestamp, AuthResponse, LoginRequest, RegisterRequest, Role, User, UserResponse};
use crate::AppState;

/// Identity taken from a verified access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Extract the bearer token from request headers.
///
/// Returns None when the header is missing or is not a `Bearer` credential.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Auth middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let claims = state.tokens.verify(token)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Admin gate. Must be layered inside `auth_middleware`.
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let user = request.extensions().get::<AuthUser>().cloned();
    match user {
        Some(user) if user.is_admin() => Ok(next.run(request).await),
        Some(user) => {
            tracing::warn!(user_id = %user.user_id, path = %request.uri().path(), "Non-admin denied");
            Err(ApiError::forbidden("Admin access required"))
        }
        None => Err(ApiError::forbidden("Admin access required")),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_response(state: &AppState, user: User) -> Result<Json<AuthResponse>, ApiError> {
    let token = state.tokens.issue(&user.id, user.role_enum())?;
    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

async fn find_user(state: &AppState, id: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    Ok(user)
}

/// Register a new account with the USER role
///
/// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();

    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&email));
    errors.check("name", validate_required(&name, "Name", 100));
    errors.check("password", validate_password(&req.password));
    errors.finish()?;

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        name,
        password_hash,
        role: Role::User.as_str().to_string(),
        created_at: now_timestamp(),
    };

    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(&user.role)
    .bind(&user.created_at)
    .execute(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("User already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User registered");

    issue_response(&state, user)
}

/// Login endpoint
///
/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(normalize_email(&req.email))
        .fetch_optional(&state.db)
        .await?;

    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => return Err(ApiError::unauthorized("Invalid credentials")),
    };

    tracing::info!(user_id = %user.id, "User logged in");

    issue_response(&state, user)
}

/// Exchange a valid token for a fresh one
///
/// POST /api/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = find_user(&state, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    issue_response(&state, user)
}

/// Current user's profile
///
/// GET /api/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = find_user(&state, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok(Json(UserResponse::from(user)))
}
