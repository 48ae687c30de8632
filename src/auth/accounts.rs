//! User account service
//!
//! Handles signup, login by username or gmail, and session tokens.

use sqlx::sqlite::SqlitePool;
use thiserror::Error;
use tokio::task;

use super::{
    generate_token, hash_password, valid_email, valid_username, verify_password,
    DEFAULT_HASH_COST, MIN_PASSWORD_LEN,
};

/// User data
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub gmail: String,
    pub phone: Option<String>,
    pub created_at: String,
}

/// Signup form fields
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub gmail: &'a str,
    pub phone: Option<&'a str>,
    pub password: &'a str,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username or email already exists")]
    UsernameExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Map a UNIQUE violation on username or gmail to `UsernameExists`
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AuthError::UsernameExists,
        _ => AuthError::Database(err),
    }
}

type UserRow = (String, String, String, Option<String>, String);

fn user_from_row((id, username, gmail, phone, created_at): UserRow) -> User {
    User {
        id,
        username,
        gmail,
        phone,
        created_at,
    }
}

/// Account service for authentication operations
pub struct AccountService {
    pool: SqlitePool,
    hash_cost: u32,
}

impl AccountService {
    /// Create a new account service
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    /// Use a different bcrypt cost for new password hashes
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Register a new user
    pub async fn signup(&self, new_user: &NewUser<'_>) -> Result<User, AuthError> {
        let username = new_user.username.trim();
        let gmail = new_user.gmail.trim().to_lowercase();

        if !valid_username(username) {
            return Err(AuthError::InvalidInput(
                "Username must be 3-50 letters, digits, '_', '.' or '-'".to_string(),
            ));
        }
        if !valid_email(&gmail) {
            return Err(AuthError::InvalidInput("Invalid email address".to_string()));
        }
        if new_user.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        // Fast path; the UNIQUE constraints decide races below
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = ? OR gmail = ?")
                .bind(username)
                .bind(&gmail)
                .fetch_optional(&self.pool)
                .await?;

        if existing.is_some() {
            return Err(AuthError::UsernameExists);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let password = new_user.password.to_string();
        let cost = self.hash_cost;
        let password_hash = task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();
        let phone = new_user
            .phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        sqlx::query(
            "INSERT INTO users (id, username, gmail, phone, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(&gmail)
        .bind(&phone)
        .bind(&password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(User {
            id,
            username: username.to_string(),
            gmail,
            phone,
            created_at: now,
        })
    }

    /// Login with username or gmail and password, returns a fresh token
    pub async fn login(&self, login: &str, password: &str) -> Result<(User, String), AuthError> {
        let login = login.trim();
        let row: Option<(String, String, String, Option<String>, String, String)> =
            sqlx::query_as(
                "SELECT id, username, gmail, phone, created_at, password_hash
                 FROM users WHERE gmail = ? OR username = ?",
            )
            .bind(login.to_lowercase())
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        let (id, username, gmail, phone, created_at, stored_hash) =
            row.ok_or(AuthError::InvalidCredentials)?;

        let password = password.to_string();
        let verified = task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_token();

        sqlx::query("UPDATE users SET token = ? WHERE id = ?")
            .bind(&token)
            .bind(&id)
            .execute(&self.pool)
            .await?;

        let user = User {
            id,
            username,
            gmail,
            phone,
            created_at,
        };

        Ok((user, token))
    }

    /// Validate a token and return the associated user
    pub async fn validate_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, gmail, phone, created_at FROM users WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Logout by clearing the token
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET token = NULL WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, gmail, phone, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }
}
