/*!
 * # Authentication and Authorization Module
 *
 * Session tokens are HS256 JWTs carried either as `Authorization: Bearer`
 * or in the http-only `session` cookie. Route access is gated by user role.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user::{self, Entity as UserEntity, UserRole, UserStatus};
use crate::errors::{DbResultExt, ServiceError};

pub mod password;

pub use password::{hash_password, verify_password, PasswordPolicy, DUMMY_PASSWORD_HASH};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Claim structure for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: UserRole,
    pub email: String,
    pub name: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// Admins pass every gate.
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.is_admin() || roles.contains(&self.role)
    }
}

impl Claims {
    /// The user id carried in `sub`
    pub fn user_id(&self) -> Result<i32, ServiceError> {
        self.sub
            .parse::<i32>()
            .map_err(|_| ServiceError::TokenError("Malformed subject".to_string()))
    }
}

impl AuthUser {
    /// Identity for a request, taken from the stored user row rather than
    /// the token so role and status changes apply immediately.
    pub fn from_user(user: user::Model, token_id: String) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            token_id,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        session_ttl: Duration,
        secure_cookies: bool,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            session_ttl,
            secure_cookies,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_audience.clone(),
            cfg.jwt_issuer.clone(),
            Duration::from_secs(cfg.session_ttl_secs),
            cfg.is_production(),
        )
    }
}

/// Issued session token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Signs a session token for the given user
    pub fn issue_token(&self, user: &user::Model) -> Result<SessionToken, ServiceError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.config.session_ttl)
            .map_err(|_| ServiceError::InternalError("Invalid session duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::TokenError(e.to_string()))?;

        Ok(SessionToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.session_ttl.as_secs() as i64,
        })
    }

    /// Checks signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::TokenError("Token has expired".to_string())
            }
            _ => ServiceError::TokenError(e.to_string()),
        })
    }

    /// Validates the token and reloads its user. A deleted user is
    /// Unauthorized and an inactive one Forbidden.
    pub async fn authenticate_token(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.validate_token(token)?;
        let user_id = claims.user_id()?;

        let user = UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .or_db_error("authenticate_token")?
            .ok_or_else(|| ServiceError::Unauthorized("Session user no longer exists".to_string()))?;

        if user.status == UserStatus::Inactive {
            return Err(ServiceError::Forbidden("Account is inactive".to_string()));
        }

        Ok(AuthUser::from_user(user, claims.jti))
    }

    /// `Set-Cookie` value carrying a freshly issued session
    pub fn session_cookie(&self, token: &str) -> Result<HeaderValue, ServiceError> {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.config.session_ttl.as_secs()
        );
        if self.config.secure_cookies {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|e| ServiceError::InternalError(e.to_string()))
    }

    /// `Set-Cookie` value that expires the session cookie
    pub fn cleared_session_cookie(&self) -> HeaderValue {
        let cookie = if self.config.secure_cookies {
            "session=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0; Secure"
        } else {
            "session=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"
        };
        HeaderValue::from_static(cookie)
    }
}

/// Bearer token first, then the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Authentication middleware that validates the session token and stores the
/// `AuthUser` in the request extensions
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let Some(token) = token_from_headers(request.headers()) else {
        return ServiceError::Unauthorized("Authentication required".to_string()).into_response();
    };

    match auth_service.authenticate_token(&token).await {
        Ok(user) => {
            debug!(user_id = user.user_id, role = %user.role, "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            warn!(error = %e, "Rejected session token");
            e.into_response()
        }
    }
}

/// Roles allowed past a gate
#[derive(Clone, Copy, Debug)]
pub struct RoleGate(pub &'static [UserRole]);

/// Role middleware to check that the authenticated user holds one of the roles
pub async fn role_middleware(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    if !user.has_any_role(gate.0) {
        warn!(user_id = user.user_id, role = %user.role, "Role not permitted for route");
        return Err(ServiceError::Forbidden(format!(
            "Role {} may not perform this action",
            user.role
        )));
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}

/// Per-method role gates. Must sit inside a router that has `with_auth`.
pub trait RoleRouteExt {
    fn with_roles(self, roles: &'static [UserRole]) -> Self;
}

impl<S> RoleRouteExt for MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_roles(self, roles: &'static [UserRole]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            RoleGate(roles),
            role_middleware,
        ))
    }
}

/// Role sets used by the route table
pub mod roles {
    use crate::entities::user::UserRole;

    pub const ADMIN: &[UserRole] = &[UserRole::Admin];
    pub const INVENTORY_WRITE: &[UserRole] = &[UserRole::Admin, UserRole::Farmer];
    pub const ORDERS_WRITE: &[UserRole] = &[UserRole::Admin, UserRole::Processor];
    pub const SHIPMENTS_WRITE: &[UserRole] =
        &[UserRole::Admin, UserRole::Farmer, UserRole::Transporter];
    pub const PROCESSING: &[UserRole] = &[UserRole::Admin, UserRole::Processor];
}
