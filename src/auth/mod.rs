use actix_web::{Error as ActixError, FromRequest, HttpRequest, dev::Payload, web::Data};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    database::models::{User, UserRole},
    error::AppError,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i64,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

pub fn issue_access_token(
    user_id: i64,
    role: UserRole,
    secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::internal("token expiry overflow"))?
        .timestamp() as usize;

    let claims = Claims {
        uid: user_id,
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|err| AppError::internal(format!("failed to sign token: {}", err)))
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
}

/// Bearer header first, then the access-token cookie.
fn access_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        req.cookie(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// The authenticated, active caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

impl FromRequest for AuthUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = access_token(req);
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let state =
                state.ok_or_else(|| AppError::internal("application state is not configured"))?;
            let token =
                token.ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;
            let claims = verify_access_token(&token, &state.config.auth.jwt_secret)?;

            let user = state
                .users
                .find_by_id(claims.uid)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

            if !user.is_active() {
                return Err(AppError::Forbidden("Account disabled".to_string()).into());
            }

            Ok(AuthUser { user })
        })
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthUser::from_request(req, payload);

        Box::pin(async move {
            let auth = auth.await?;
            if !auth.user.is_admin() {
                return Err(AppError::Forbidden("Admin role required".to_string()).into());
            }
            Ok(AdminUser(auth))
        })
    }
}
