//! User and administrator repositories.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biodesk_core::{AdminRecord, AdminRepository, Error, Result, UserRecord, UserRepository};

use crate::profiles::map_unique_violation;

fn password_hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Hash an administrator password into an Argon2id PHC string with a
/// random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    password_hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a candidate password against a stored PHC string.
///
/// Anything that does not parse as a PHC string never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => password_hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        google_id: row.get("google_id"),
        access: row.get("access"),
        payment: row.get("payment"),
        created_at: row.get("created_at"),
    }
}

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            r#"SELECT id, email, google_id, access, payment, created_at
               FROM app_user WHERE google_id = $1"#,
        )
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert(&self, email: &str, google_id: &str) -> Result<UserRecord> {
        let row = sqlx::query(
            r#"INSERT INTO app_user (id, email, google_id)
               VALUES ($1, $2, $3)
               RETURNING id, email, google_id, access, payment, created_at"#,
        )
        .bind(Uuid::now_v7())
        .bind(email)
        .bind(google_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A user with this identity"))?;
        Ok(user_from_row(&row))
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, email, google_id, access, payment, created_at
               FROM app_user ORDER BY created_at"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn set_access(&self, id: Uuid, access: bool) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            r#"UPDATE app_user SET access = $2 WHERE id = $1
               RETURNING id, email, google_id, access, payment, created_at"#,
        )
        .bind(id)
        .bind(access)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }
}

/// PostgreSQL implementation of AdminRepository.
#[derive(Clone)]
pub struct PgAdminRepository {
    pool: Pool<Postgres>,
}

impl PgAdminRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminRepository for PgAdminRepository {
    async fn find_by_name(&self, admin_name: &str) -> Result<Option<AdminRecord>> {
        let row = sqlx::query("SELECT id, admin_name, password_hash FROM admin WHERE admin_name = $1")
            .bind(admin_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| AdminRecord {
            id: row.get("id"),
            admin_name: row.get("admin_name"),
            password_hash: row.get("password_hash"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_salted_argon2id() {
        let first = hash_password("secret").unwrap();
        let second = hash_password("secret").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_password() {
        let stored = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
        assert!(!verify_password("hunter2", "hunter2"));
    }

    #[test]
    fn test_legacy_sha256_digest_never_verifies() {
        let legacy = "sha256:f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7";
        assert!(!verify_password("hunter2", legacy));
    }
}
