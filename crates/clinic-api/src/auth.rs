use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::{State, rejection::JsonRejection}, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use clinic_db::models::UserRow;
use clinic_types::api::{Claims, DataResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use clinic_types::models::{Registration, User};
use clinic_types::validation::ValidationErrors;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let Registration { name, email, password } = req.validate()?;

    // Check if email is taken
    let lookup = email.clone();
    if run_db(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(email_taken());
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();

    // The UNIQUE column still catches a concurrent registration of the same email.
    let user_id = run_db(&state, move |db| db.create_user(&name, &email, &password_hash))
        .await?
        .ok_or_else(email_taken)?;
    info!("Registered user {}", user_id);

    Ok(Json(MessageResponse {
        message: "User is created successfully".into(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let credentials = req.validate()?;

    let email = credentials.email.clone();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| {
            warn!("Login rejected: no user with the submitted email");
            ApiError::InvalidCredentials
        })?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored hash for user {} is unreadable: {}", user.id, e))?;

    Argon2::default()
        .verify_password(credentials.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Login rejected: wrong password for user {}", user.id);
            ApiError::InvalidCredentials
        })?;

    let token = create_token(&state.jwt_secret, &user)?;
    info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        message: "Login successfully".into(),
        token,
    }))
}

/// GET /user: the account behind the bearer token.
pub async fn current_user(Extension(user): Extension<User>) -> Json<DataResponse<User>> {
    Json(DataResponse::new("Success", user))
}

fn email_taken() -> ApiError {
    let mut errors = ValidationErrors::new();
    errors.add("email", "The email has already been taken.");
    errors.into()
}

fn create_token(secret: &str, user: &UserRow) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: chrono::Utc::now().timestamp() as usize,
        jti: Uuid::new_v4(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
