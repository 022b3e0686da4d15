//! User accounts, login, and email verification.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use domain::{User, validate};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::routes::parse_user_id;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

fn check_profile_fields(
    phone: Option<&str>,
    postal_code: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(phone) = phone {
        validate::phone(phone)?;
    }
    if let Some(postal_code) = postal_code {
        validate::postal_code(postal_code)?;
    }
    Ok(())
}

/// Issues a fresh verification code and sends it, best-effort.
///
/// A delivery failure is logged and swallowed; the surrounding request
/// still succeeds and the code can be re-sent later.
async fn issue_and_send_code<S: Store>(state: &AppState<S>, user: &mut User) -> Result<(), ApiError> {
    let code = mail::generate_verification_code();
    user.issue_verification_code(code.clone(), Utc::now());
    state.store.update_user(user).await?;

    if let Err(e) = state
        .mailer
        .send_verification_code(&user.email, user.first_name.as_deref(), &code)
        .await
    {
        tracing::warn!(error = %e, email = %user.email, "failed to send verification email");
    }
    Ok(())
}

/// POST /utilisateurs — register a new account.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }
    check_profile_fields(req.phone.as_deref(), req.postal_code.as_deref())?;

    let password_hash = hash_password(&req.password)?;
    let mut user = User::new(req.email, password_hash)?;
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    user.phone = req.phone;
    user.street = req.street;
    user.postal_code = req.postal_code;
    user.city = req.city;
    if let Some(country) = req.country {
        user.country = country;
    }

    state.store.insert_user(&user).await?;
    metrics::counter!("users_registered_total").increment(1);

    issue_and_send_code(&state, &mut user).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /login — verify credentials.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| ApiError::Unauthorized("invalid credentials".to_string()))?;

    verify_password(&req.password, &user.password_hash)?;
    Ok(Json(user))
}

/// POST /verify-email — consume a verification code.
#[tracing::instrument(skip(state, req))]
pub async fn verify_email<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<User>, ApiError> {
    let mut user = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| ApiError::NotFound(format!("no account for {}", req.email)))?;

    user.verify_code(&req.code, Utc::now())?;
    state.store.update_user(&user).await?;

    Ok(Json(user))
}

/// POST /resend-verification — issue and send a fresh code.
#[tracing::instrument(skip(state, req))]
pub async fn resend_verification<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ResendVerificationRequest>,
) -> Result<StatusCode, ApiError> {
    let mut user = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| ApiError::NotFound(format!("no account for {}", req.email)))?;

    if user.email_verified {
        return Err(ApiError::BadRequest("email is already verified".to_string()));
    }

    issue_and_send_code(&state, &mut user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /utilisateurs/:id — fetch a user profile.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id = parse_user_id(&id)?;
    let user = state.store.get_user(user_id).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("user {id} not found")),
        other => other.into(),
    })?;
    Ok(Json(user))
}

/// PUT /utilisateurs/:id — partial profile update.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    check_profile_fields(req.phone.as_deref(), req.postal_code.as_deref())?;

    let user_id = parse_user_id(&id)?;
    let mut user = state.store.get_user(user_id).await.map_err(|e| match e {
        store::StoreError::NotFound => ApiError::NotFound(format!("user {id} not found")),
        other => other.into(),
    })?;

    if let Some(first_name) = req.first_name {
        user.first_name = Some(first_name);
    }
    if let Some(last_name) = req.last_name {
        user.last_name = Some(last_name);
    }
    if let Some(phone) = req.phone {
        user.phone = Some(phone);
    }
    if let Some(street) = req.street {
        user.street = Some(street);
    }
    if let Some(postal_code) = req.postal_code {
        user.postal_code = Some(postal_code);
    }
    if let Some(city) = req.city {
        user.city = Some(city);
    }
    if let Some(country) = req.country {
        user.country = country;
    }
    user.updated_at = Utc::now();

    state.store.update_user(&user).await?;
    Ok(Json(user))
}
