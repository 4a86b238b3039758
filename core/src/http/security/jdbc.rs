//! SQL-backed credential store.
//!
//! # Spring Security Equivalent
//! `JdbcUserDetailsManager` with the default `users` / `authorities` schema
//!
//! Roles are stored as `ROLE_<name>` rows next to plain authorities. Every
//! write touching both tables runs in a single transaction.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};

use crate::http::security::user_details::{
    UserDetailsError, UserDetailsManager, UserDetailsService,
};
use crate::http::security::User;

/// Statements creating the default schema.
pub const DEFAULT_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        username VARCHAR(50) NOT NULL PRIMARY KEY,
        password VARCHAR(500) NOT NULL,
        enabled BOOLEAN NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS authorities (
        username VARCHAR(50) NOT NULL,
        authority VARCHAR(50) NOT NULL,
        CONSTRAINT fk_authorities_users FOREIGN KEY (username) REFERENCES users (username)
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS ix_auth_username ON authorities (username, authority)",
];

impl From<sqlx::Error> for UserDetailsError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                UserDetailsError::AlreadyExists
            }
            _ => UserDetailsError::storage(&err),
        }
    }
}

/// [`UserDetailsManager`] over a SQLite pool.
#[derive(Clone)]
pub struct SqlUserDetailsManager {
    pool: SqlitePool,
}

impl SqlUserDetailsManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `url`.
    ///
    /// An in-memory database exists per connection, so `sqlite::memory:` is
    /// held on exactly one connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, UserDetailsError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        }
        .connect_with(options)
        .await?;

        Ok(Self::new(pool))
    }

    pub async fn create_schema(&self) -> Result<(), UserDetailsError> {
        for statement in DEFAULT_SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert_authorities(
        tx: &mut Transaction<'_, Sqlite>,
        user: &User,
    ) -> Result<(), UserDetailsError> {
        for authority in user.granted_authorities() {
            sqlx::query("INSERT INTO authorities (username, authority) VALUES (?, ?)")
                .bind(user.get_username())
                .bind(authority)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserDetailsService for SqlUserDetailsManager {
    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserDetailsError> {
        let row = sqlx::query("SELECT username, password, enabled FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let authorities: Vec<String> = sqlx::query_scalar(
            "SELECT authority FROM authorities WHERE username = ? ORDER BY rowid",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        let user = User::with_encoded_password(
            &row.try_get::<String, _>("username")?,
            row.try_get("password")?,
        )
        .enabled(row.try_get("enabled")?)
        .granted(&authorities);

        Ok(Some(user))
    }
}

#[async_trait]
impl UserDetailsManager for SqlUserDetailsManager {
    async fn create_user(&self, user: &User) -> Result<(), UserDetailsError> {
        if user.get_username().is_empty() {
            return Err(UserDetailsError::InvalidUsername);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (username, password, enabled) VALUES (?, ?, ?)")
            .bind(user.get_username())
            .bind(user.get_password())
            .bind(user.is_enabled())
            .execute(&mut *tx)
            .await?;
        Self::insert_authorities(&mut tx, user).await?;
        tx.commit().await?;

        log::info!("Created user '{}'", user.get_username());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), UserDetailsError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE users SET password = ?, enabled = ? WHERE username = ?")
            .bind(user.get_password())
            .bind(user.is_enabled())
            .bind(user.get_username())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(UserDetailsError::NotFound);
        }

        sqlx::query("DELETE FROM authorities WHERE username = ?")
            .bind(user.get_username())
            .execute(&mut *tx)
            .await?;
        Self::insert_authorities(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn disable_user(&self, username: &str) -> Result<(), UserDetailsError> {
        let updated = sqlx::query("UPDATE users SET enabled = FALSE WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(UserDetailsError::NotFound);
        }

        log::info!("Disabled user '{}'", username);
        Ok(())
    }

    async fn change_password(
        &self,
        username: &str,
        new_encoded_password: &str,
    ) -> Result<(), UserDetailsError> {
        let updated = sqlx::query("UPDATE users SET password = ? WHERE username = ?")
            .bind(new_encoded_password)
            .bind(username)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(UserDetailsError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlUserDetailsManager {
        let store = SqlUserDetailsManager::connect("sqlite::memory:", 1)
            .await
            .unwrap();
        store.create_schema().await.unwrap();
        store
    }

    fn daffy() -> User {
        User::with_encoded_password("daffy", "{noop}duck".into())
            .roles(&["USER".into(), "MANAGER".into()])
            .authorities(&["reports:read".into()])
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let store = store().await;
        store.create_user(&daffy()).await.unwrap();

        let loaded = store.load_user_by_username("daffy").await.unwrap().unwrap();
        assert_eq!(loaded, daffy());
        assert!(store.user_exists("daffy").await.unwrap());
        assert!(store.load_user_by_username("elmer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roles_are_stored_with_prefix() {
        let store = store().await;
        store.create_user(&daffy()).await.unwrap();

        let rows: Vec<String> =
            sqlx::query_scalar("SELECT authority FROM authorities WHERE username = 'daffy' ORDER BY authority")
                .fetch_all(store.pool())
                .await
                .unwrap();
        assert_eq!(rows, vec!["ROLE_MANAGER", "ROLE_USER", "reports:read"]);
    }

    #[tokio::test]
    async fn test_duplicate_user_is_rejected() {
        let store = store().await;
        store.create_user(&daffy()).await.unwrap();

        assert_eq!(
            store.create_user(&daffy()).await,
            Err(UserDetailsError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_update_replaces_grants() {
        let store = store().await;
        store.create_user(&daffy()).await.unwrap();

        let demoted = User::with_encoded_password("daffy", "{noop}duck".into()).roles(&["USER".into()]);
        store.update_user(&demoted).await.unwrap();

        let loaded = store.load_user_by_username("daffy").await.unwrap().unwrap();
        assert!(loaded.has_role("USER"));
        assert!(!loaded.has_role("MANAGER"));
        assert!(loaded.get_authorities().is_empty());

        let ghost = User::with_encoded_password("ghost", "x".into());
        assert_eq!(store.update_user(&ghost).await, Err(UserDetailsError::NotFound));
    }

    #[tokio::test]
    async fn test_disable_and_change_password() {
        let store = store().await;
        store.create_user(&daffy()).await.unwrap();

        store.disable_user("daffy").await.unwrap();
        store.change_password("daffy", "{noop}mallard").await.unwrap();

        let loaded = store.load_user_by_username("daffy").await.unwrap().unwrap();
        assert!(!loaded.is_enabled());
        assert_eq!(loaded.get_password(), "{noop}mallard");
        assert!(loaded.has_role("MANAGER"));

        assert_eq!(store.disable_user("elmer").await, Err(UserDetailsError::NotFound));
        assert_eq!(
            store.change_password("elmer", "x").await,
            Err(UserDetailsError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_closed_pool_reports_storage_error() {
        let store = store().await;
        store.pool().close().await;

        let result = store.load_user_by_username("daffy").await;
        assert!(matches!(result, Err(UserDetailsError::StorageError { .. })));
    }
}
