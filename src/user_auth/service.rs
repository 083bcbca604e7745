use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

use super::otp::{OtpChallenge, OtpError, OtpGate};
use super::principal::Principal;
use crate::gateway::types::{ErrorCode, error_codes};
use crate::ledger::{LedgerStore, NewUser, OtpKind, Role, StoreError, User, UserId};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Email is not verified")]
    EmailNotVerified,

    #[error("Invalid or expired verification code")]
    InvalidOtp,

    #[error("{0}")]
    RateLimited(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error")]
    Internal(String),
}

impl ErrorCode for AuthError {
    fn code(&self) -> i32 {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken => error_codes::AUTH_FAILED,
            AuthError::EmailTaken => error_codes::CONFLICT,
            AuthError::EmailNotVerified => error_codes::EMAIL_NOT_VERIFIED,
            AuthError::InvalidOtp => error_codes::INVALID_OTP,
            AuthError::RateLimited(_) => error_codes::RATE_LIMITED,
            AuthError::Forbidden => error_codes::FORBIDDEN,
            AuthError::Validation(_) => error_codes::INVALID_PARAMETER,
            AuthError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    fn http_status(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken => 401,
            AuthError::EmailTaken => 409,
            AuthError::EmailNotVerified | AuthError::Forbidden => 403,
            AuthError::InvalidOtp | AuthError::Validation(_) => 400,
            AuthError::RateLimited(_) => 429,
            AuthError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => AuthError::EmailTaken,
            other => {
                tracing::error!(error = %other, "[AUTH] Store failure");
                AuthError::Internal(other.to_string())
            }
        }
    }
}

impl From<OtpError> for AuthError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::Invalid => AuthError::InvalidOtp,
            OtpError::RateLimited { .. } => AuthError::RateLimited(e.to_string()),
            OtpError::Store(store) => store.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(e: validator::ValidationErrors) -> Self {
        AuthError::Validation(e.to_string())
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    pub role: Role,
    pub exp: usize, // Expiration time (as UTC timestamp)
    pub iat: usize, // Issued at
}

/// User Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Ada Miner")]
    pub name: String,
    #[validate(email)]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "password123")]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Submit a code received by email
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyCodeRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    #[schema(example = "123456")]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "[AUTH] Stored hash is not a PHC string");
            false
        }
    }
}

pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    otp: Arc<dyn OtpGate>,
    jwt_secret: String,
    jwt_ttl: Duration,
    admin_emails: Vec<String>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        otp: Arc<dyn OtpGate>,
        jwt_secret: String,
        jwt_ttl_hours: i64,
        admin_emails: Vec<String>,
    ) -> Self {
        Self {
            store,
            otp,
            jwt_secret,
            jwt_ttl: Duration::hours(jwt_ttl_hours),
            admin_emails: admin_emails.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Create an unverified user and send the signup code
    pub async fn register(&self, req: RegisterRequest) -> Result<OtpChallenge, AuthError> {
        req.validate()?;
        let email = req.email.trim().to_lowercase();

        let role = if self.admin_emails.contains(&email) {
            Role::Admin
        } else {
            Role::User
        };

        let user = self
            .store
            .insert_user(NewUser {
                email: email.clone(),
                password_hash: hash_password(&req.password)?,
                name: req.name.trim().to_string(),
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "[AUTH] User registered");

        Ok(self
            .otp
            .issue(&email, OtpKind::Signup, "Welcome to minebank.")
            .await?)
    }

    /// Confirm the signup code; logs the user in
    pub async fn verify_signup(&self, req: VerifyCodeRequest) -> Result<AuthResponse, AuthError> {
        req.validate()?;
        let user = self.user_by_email(&req.email).await?;
        self.otp
            .verify(&user.email, &req.code, OtpKind::Signup)
            .await?;
        self.store.mark_verified(user.id).await?;

        let user = self.fresh(user.id).await?;
        tracing::info!(user_id = user.id, "[AUTH] Email verified");
        self.auth_response(user)
    }

    /// Check the password and send a login code
    pub async fn login(&self, req: LoginRequest) -> Result<OtpChallenge, AuthError> {
        req.validate()?;
        let user = self
            .store
            .user_by_email(&req.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&req.password, &user.password_hash) {
            tracing::warn!(user_id = user.id, "[AUTH] Wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_verified {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(self
            .otp
            .issue(&user.email, OtpKind::Login, "Use it to finish signing in.")
            .await?)
    }

    /// Second login step: code → JWT
    pub async fn verify_login(&self, req: VerifyCodeRequest) -> Result<AuthResponse, AuthError> {
        req.validate()?;
        let user = self.user_by_email(&req.email).await?;
        self.otp
            .verify(&user.email, &req.code, OtpKind::Login)
            .await?;

        tracing::info!(user_id = user.id, "[AUTH] Login");
        self.auth_response(user)
    }

    /// Sends a reset code when the account exists; silent otherwise
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<(), AuthError> {
        req.validate()?;
        if let Some(user) = self.store.user_by_email(&req.email).await? {
            self.otp
                .issue(
                    &user.email,
                    OtpKind::PasswordReset,
                    "Ignore this email if you did not ask for a reset.",
                )
                .await?;
        }
        Ok(())
    }

    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AuthError> {
        req.validate()?;
        let user = self.user_by_email(&req.email).await?;
        self.otp
            .verify(&user.email, &req.code, OtpKind::PasswordReset)
            .await?;

        let hash = hash_password(&req.new_password)?;
        self.store.set_password_hash(user.id, &hash).await?;
        tracing::info!(user_id = user.id, "[AUTH] Password reset");
        Ok(())
    }

    pub async fn me(&self, principal: &Principal) -> Result<User, AuthError> {
        self.fresh(principal.user_id).await
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: (now + self.jwt_ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, AuthError> {
        Ok(AuthResponse {
            token: self.issue_token(&user)?,
            user,
        })
    }

    /// Unknown emails surface as a bad code, not as "no such user"
    async fn user_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.store
            .user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidOtp)
    }

    async fn fresh(&self, id: UserId) -> Result<User, AuthError> {
        self.store
            .user(id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedgerStore;
    use crate::notify::LogNotifier;
    use crate::user_auth::otp::OtpService;

    fn service(store: Arc<MemoryLedgerStore>) -> AccountService {
        let otp = Arc::new(OtpService::new(
            store.clone(),
            Arc::new(LogNotifier),
            600,
            60,
            std::time::Duration::from_millis(100),
        ));
        AccountService::new(
            store,
            otp,
            "test-secret".to_string(),
            1,
            vec!["root@example.com".to_string()],
        )
    }

    async fn code(store: &MemoryLedgerStore, email: &str, kind: OtpKind) -> String {
        store.latest_otp(email, kind).await.unwrap().unwrap().code
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "plaintext"));
    }

    #[tokio::test]
    async fn test_signup_then_login_flow() {
        let store = Arc::new(MemoryLedgerStore::new());
        let auth = service(store.clone());

        auth.register(register_req("ada@example.com")).await.unwrap();

        // unverified users cannot log in
        let login = LoginRequest {
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(matches!(
            auth.login(login).await,
            Err(AuthError::EmailNotVerified)
        ));

        let signup_code = code(&store, "ada@example.com", OtpKind::Signup).await;
        let verified = auth
            .verify_signup(VerifyCodeRequest {
                email: "ada@example.com".to_string(),
                code: signup_code,
            })
            .await
            .unwrap();
        assert!(verified.user.is_verified);

        auth.login(LoginRequest {
            email: "ADA@example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap();
        let login_code = code(&store, "ada@example.com", OtpKind::Login).await;
        let response = auth
            .verify_login(VerifyCodeRequest {
                email: "ada@example.com".to_string(),
                code: login_code,
            })
            .await
            .unwrap();

        let claims = auth.verify_token(&response.token).unwrap();
        assert_eq!(claims.sub, response.user.id.to_string());
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let store = Arc::new(MemoryLedgerStore::new());
        let auth = service(store);
        auth.register(register_req("bob@example.com")).await.unwrap();

        let result = auth
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "incorrect".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = Arc::new(MemoryLedgerStore::new());
        let auth = service(store);
        auth.register(register_req("dup@example.com")).await.unwrap();
        assert!(matches!(
            auth.register(register_req("DUP@example.com")).await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_configured_admin_email_gets_admin_role() {
        let store = Arc::new(MemoryLedgerStore::new());
        let auth = service(store.clone());
        auth.register(register_req("root@example.com")).await.unwrap();
        let user = store.user_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_password_reset() {
        let store = Arc::new(MemoryLedgerStore::new());
        let auth = service(store.clone());
        auth.register(register_req("eve@example.com")).await.unwrap();

        auth.forgot_password(ForgotPasswordRequest {
            email: "eve@example.com".to_string(),
        })
        .await
        .unwrap();
        let reset_code = code(&store, "eve@example.com", OtpKind::PasswordReset).await;
        auth.reset_password(ResetPasswordRequest {
            email: "eve@example.com".to_string(),
            code: reset_code,
            new_password: "brand new pass".to_string(),
        })
        .await
        .unwrap();

        let user = store.user_by_email("eve@example.com").await.unwrap().unwrap();
        assert!(verify_password("brand new pass", &user.password_hash));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let store = Arc::new(MemoryLedgerStore::new());
        let auth = service(store);
        assert!(matches!(
            auth.verify_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_short_password_fails_validation() {
        let req = RegisterRequest {
            name: "A".to_string(),
            email: "a@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
