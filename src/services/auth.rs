//! Credential checks, access tokens and account registration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::db::{CreateUserRequest, DbPool, TokenResponse, User, UserResponse, UserRole};

use super::validation::validate_create_user;
use super::{Identity, ServiceError};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Fail with `Forbidden` unless the caller holds `role`.
pub fn require_role(caller: &Identity, role: UserRole) -> Result<(), ServiceError> {
    if caller.role == role {
        Ok(())
    } else {
        warn!(
            user = %caller.username,
            role = %caller.role,
            required = %role,
            "Operation denied"
        );
        Err(ServiceError::Forbidden(format!(
            "This operation requires the {} role",
            role
        )))
    }
}

/// Signed access token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the holder
    pub sub: String,
    pub uid: i64,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthService {
    db: DbPool,
    config: AuthConfig,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(db: DbPool, config: AuthConfig) -> Self {
        let secret = match &config.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                // Tokens signed with a generated key do not survive a restart
                warn!("No auth.jwt_secret configured, generating an ephemeral signing key");
                let bytes: [u8; 32] = rand::rng().random();
                hex::encode(bytes)
            }
        };
        Self {
            algorithm: config.jwt_algorithm.into(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            db,
            config,
        }
    }

    /// Check a username and password pair.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, ServiceError> {
        let user = self.find_by_username(username).await?;

        match user {
            Some(user) if verify_password(password, &user.hashed_password) => Ok(Identity {
                id: user.id,
                username: user.username,
                role: user.role,
            }),
            _ => {
                warn!(username = %username, "Failed login attempt");
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    /// Authenticate and issue a bearer token with the configured lifetime
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ServiceError> {
        let identity = self.authenticate(username, password).await?;
        let token = self.issue_token(&identity, None)?;
        info!(user = %identity.username, "User logged in");
        Ok(TokenResponse::bearer(token))
    }

    /// Sign an access token for `identity`.
    ///
    /// `ttl` overrides the configured lifetime and may be negative.
    pub fn issue_token(
        &self,
        identity: &Identity,
        ttl: Option<Duration>,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(self.config.token_ttl_minutes));

        let claims = Claims {
            sub: identity.username.clone(),
            uid: identity.id,
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a bearer token and load the user it names.
    ///
    /// The role is re-read from the store so demotions apply immediately.
    pub async fn resolve_identity(&self, token: &str) -> Result<Identity, ServiceError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                ServiceError::Unauthenticated
            })?
            .claims;

        let user = self
            .find_by_username(&claims.sub)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        Ok(Identity {
            id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    /// Register a new account on behalf of an admin
    pub async fn create_user(
        &self,
        caller: &Identity,
        req: CreateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        let user = self.register_user(req).await?;
        info!(
            created_by = %caller.username,
            user = %user.username,
            role = %user.role,
            "User created"
        );
        Ok(user)
    }

    /// Register a new account without an authorization check.
    ///
    /// Used for bootstrapping and by the command line.
    pub async fn register_user(&self, req: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        validate_create_user(&req)?;

        if self.find_by_username(&req.username).await?.is_some() {
            return Err(ServiceError::AlreadyRegistered(
                "Username already registered".to_string(),
            ));
        }

        let email_taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(&req.email)
            .fetch_optional(&self.db)
            .await?;
        if email_taken.is_some() {
            return Err(ServiceError::AlreadyRegistered(
                "Email already registered".to_string(),
            ));
        }

        let hashed_password = hash_password(&req.password)?;

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            "INSERT INTO users (username, email, hashed_password, role) VALUES (?, ?, ?, ?)",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&hashed_password)
        .bind(req.role)
        .execute(&mut *tx)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            // A concurrent registration won the race past the checks above
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                let message = if e.message().contains("users.email") {
                    "Email already registered"
                } else {
                    "Username already registered"
                };
                return Err(ServiceError::AlreadyRegistered(message.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(UserResponse::from(user))
    }

    /// Create the configured admin account when the store has no users.
    ///
    /// Without a configured password a random one is generated and logged once.
    pub async fn ensure_admin_user(&self) -> Result<Option<UserResponse>, ServiceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        if count > 0 {
            return Ok(None);
        }

        let password = match &self.config.admin_password {
            Some(password) => password.clone(),
            None => {
                let bytes: [u8; 12] = rand::rng().random();
                let password = hex::encode(bytes);
                warn!(
                    username = %self.config.admin_username,
                    password = %password,
                    "No admin password configured, generated one for the initial admin"
                );
                password
            }
        };

        let admin = self
            .register_user(CreateUserRequest {
                username: self.config.admin_username.clone(),
                email: self.config.admin_email.clone(),
                password,
                role: UserRole::Admin,
            })
            .await?;

        info!(user = %admin.username, "Created initial admin user");
        Ok(Some(admin))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}
