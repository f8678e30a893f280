use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::documents::{Collection, Document, Filter, StoreError};
use crate::configuration::AuthSettings;
use crate::models::{ProfileUpdate, RegisterRequest, Role, User};

const MIN_PASSWORD_LEN: usize = 6;

/// Stored user document. The hash never leaves this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "passwordHash")]
    pub password_hash: String,
}

impl Document for UserRecord {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.user.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Not authorized, no token")]
    MissingToken,
    #[error("Not authorized, token failed")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AuthService {
    users: Collection<UserRecord>,
    settings: AuthSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(users: Collection<UserRecord>, settings: AuthSettings) -> Self {
        let secret = settings.jwt_secret.expose_secret().as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);
        Self {
            users,
            settings,
            encoding_key,
            decoding_key,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<(User, String), AuthError> {
        let email = request.email.trim().to_lowercase();
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("Please provide a valid email".into()));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.find_by_email(&email).await?.is_some() {
            warn!("Registration failed: email already exists: {}", email);
            return Err(AuthError::EmailTaken);
        }

        let role = if self.settings.is_admin_email(&email) {
            Role::Admin
        } else {
            Role::User
        };
        let mut user = User::new(name, email, role);
        user.phone = request.phone;
        user.location = request.location;

        let password_hash = hash_password(request.password).await?;
        let record = UserRecord {
            user: user.clone(),
            password_hash,
        };

        match self.users.insert(&record).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration for the same email.
            Err(StoreError::Duplicate(_)) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        info!("User registered: {}", user.email);
        let token = self.issue_token(user.id)?;
        Ok((user, token))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = email.trim().to_lowercase();
        let Some(record) = self.find_by_email(&email).await? else {
            warn!("Login failed: unknown email {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), record.password_hash.clone()).await? {
            warn!("Login failed: invalid password for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        info!("User logged in: {}", email);
        let token = self.issue_token(record.user.id)?;
        Ok((record.user, token))
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::days(self.settings.token_ttl_days)).timestamp() as usize,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Resolves a bearer token to the current user record.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        match self.users.get(id).await? {
            Some(record) => Ok(record.user),
            None => Err(AuthError::InvalidToken),
        }
    }

    pub async fn me(&self, id: Uuid) -> Result<User, AuthError> {
        self.users
            .get(id)
            .await?
            .map(|record| record.user)
            .ok_or(AuthError::UserNotFound)
    }

    /// Empty strings leave the field unchanged.
    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, AuthError> {
        let mut record = self.users.get(id).await?.ok_or(AuthError::UserNotFound)?;

        if let Some(name) = update.name.filter(|v| !v.trim().is_empty()) {
            record.user.name = name;
        }
        if let Some(phone) = update.phone.filter(|v| !v.is_empty()) {
            record.user.phone = Some(phone);
        }
        if let Some(location) = update.location.filter(|v| !v.is_empty()) {
            record.user.location = Some(location);
        }
        record.user.updated_at = Utc::now();

        self.users.replace(&record).await?;
        Ok(record.user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.users.find_one(&Filter::new().eq("$.email", email)).await
    }
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hash(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hash(e.to_string()))?
}
