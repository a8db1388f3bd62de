use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::info;
use uuid::Uuid;

use pantry_db::StoreError;
use pantry_db::users::NewUser;
use pantry_types::api::{
    Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, OptinResponse,
    RegisterRequest, RegisterResponse, ResetPasswordRequest, TokenPurpose,
};

use crate::AppState;
use crate::error::ApiError;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest(
            "a valid email address is required".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    // Display name falls back to the email's local part.
    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => email.split('@').next().unwrap_or_default().to_string(),
    };

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let db = state.clone();
    let role = req.role;
    let stored_email = email.clone();
    tokio::task::spawn_blocking(move || {
        db.db.create_user(&NewUser {
            id: user_id,
            email: &stored_email,
            password_hash: &password_hash,
            name: &name,
            role,
        })
    })
    .await
    .map_err(ApiError::task)??;

    info!("New user registered: {email}");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(ApiError::task)??
        .ok_or(ApiError::InvalidCredential)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password).map_err(|_| ApiError::Internal)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredential)?;

    let user = row.into_user()?;
    let access_token = create_token(
        &state.jwt_secret,
        user.user_id,
        &user.name,
        TokenPurpose::Session,
        chrono::Duration::days(7),
    )
    .map_err(|_| ApiError::Internal)?;

    info!("User {} logged in", user.user_id);
    Ok(Json(LoginResponse { access_token, user }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(claims.sub))
        .await
        .map_err(ApiError::task)??
        .ok_or(StoreError::NotFound("user"))?;
    Ok(Json(row.into_user()?))
}

/// Flips the caller's notification opt-in and reports the new value.
pub async fn opt_update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let optin = tokio::task::spawn_blocking(move || db.db.toggle_optin(claims.sub))
        .await
        .map_err(ApiError::task)??;

    info!("User {} notification opt-in now {optin}", claims.sub);
    Ok(Json(OptinResponse { optin }))
}

/// Issues a short-lived reset token and emails it. The response is the same
/// whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    let db = state.clone();
    let lookup = email.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&lookup))
        .await
        .map_err(ApiError::task)??;

    if let Some(row) = row {
        let user = row.into_user()?;
        let token = create_token(
            &state.jwt_secret,
            user.user_id,
            &user.name,
            TokenPurpose::PasswordReset,
            chrono::Duration::minutes(30),
        )
        .map_err(|_| ApiError::Internal)?;
        state.mailer.send_password_reset(&user.email, &token).await;
        info!("Password reset link issued for {}", user.user_id);
    }

    Ok(Json(MessageResponse {
        message: "If that account exists, a reset link has been sent".into(),
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.new_password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let token_data = decode::<Claims>(
        &req.token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::InvalidCredential)?;
    // A session token must not reset passwords.
    if token_data.claims.purpose != TokenPurpose::PasswordReset {
        return Err(ApiError::InvalidCredential);
    }

    let password_hash = hash_password(&req.new_password)?;
    let user_id = token_data.claims.sub;

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.set_password(user_id, &password_hash))
        .await
        .map_err(ApiError::task)??;

    info!("Password reset for {user_id}");
    Ok(Json(MessageResponse {
        message: "Password updated".into(),
    }))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal)?
        .to_string())
}

pub(crate) fn create_token(
    secret: &str,
    user_id: Uuid,
    name: &str,
    purpose: TokenPurpose,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        purpose,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
