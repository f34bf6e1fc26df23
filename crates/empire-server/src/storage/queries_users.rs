//! User identity and profile queries.

use empire_core::db::unix_timestamp;

use super::db::{DatabaseError, StoreDatabase};
use super::models::{Profile, ProfileStatus, Role, User};

/// Fields a profile update may touch. `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar_url: Option<Option<String>>,
    pub role: Option<Role>,
    pub status: Option<ProfileStatus>,
}

impl ProfileChanges {
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.avatar_url.is_none()
            && self.role.is_none()
            && self.status.is_none()
    }
}

impl StoreDatabase {
    /// Create an identity and its profile in one transaction.
    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
    ) -> Result<Profile, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(email)
            .bind(password_hash)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO profiles (id, email, full_name, role, status, created_at, updated_at) VALUES (?, ?, ?, ?, 'active', ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_profile(id).await
    }

    /// Get an identity by its (lower-cased) email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with email {email}")))
    }

    /// Get a profile by user ID.
    pub async fn get_profile(&self, id: &str) -> Result<Profile, DatabaseError> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Profile {id}")))
    }

    /// List every profile, newest first.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, DatabaseError> {
        let profiles =
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY created_at DESC, rowid DESC")
                .fetch_all(self.pool())
                .await?;
        Ok(profiles)
    }

    /// Apply `changes` to a profile and return the updated row.
    pub async fn update_profile(
        &self,
        id: &str,
        changes: ProfileChanges,
    ) -> Result<Profile, DatabaseError> {
        let current = self.get_profile(id).await?;
        if changes.is_empty() {
            return Ok(current);
        }

        let full_name = changes.full_name.unwrap_or(current.full_name);
        let avatar_url = changes.avatar_url.unwrap_or(current.avatar_url);
        let role = changes.role.unwrap_or(current.role);
        let status = changes.status.unwrap_or(current.status);

        sqlx::query(
            "UPDATE profiles SET full_name = ?, avatar_url = ?, role = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(full_name)
        .bind(avatar_url)
        .bind(role)
        .bind(status)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_profile(id).await
    }

    /// Grant the admin role to the profile registered under `email`.
    ///
    /// Returns `false` when no such user exists yet.
    pub async fn promote_to_admin(&self, email: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE profiles SET role = 'admin', updated_at = ? WHERE email = ?")
            .bind(unix_timestamp())
            .bind(email)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
