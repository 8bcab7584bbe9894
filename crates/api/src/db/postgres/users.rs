//! Account queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use rigstore_core::{Email, Role, UserId};

use super::{PgStore, conflict_or_database};
use crate::db::{IdentityStore, RepositoryError};
use crate::models::{NewUser, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    full_name: String,
    email: String,
    role: Role,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            full_name: row.full_name,
            email,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (full_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, full_name, email, role, created_at
            ",
        )
        .bind(&user.full_name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "email"))?;

        row.try_into()
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, full_name, email, role, created_at, password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Ok((r.user.try_into()?, r.password_hash)))
            .transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, full_name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET role = $2
            WHERE email = $1
            RETURNING id, full_name, email, role, created_at
            ",
        )
        .bind(email.as_str())
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::postgres::test_support;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Grace Hopper".to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "$argon2id$stub".to_owned(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_create_and_lookup_user() {
        let store = test_support::store().await;
        let created = store.create_user(new_user("grace@example.com")).await.unwrap();

        let (found, hash) = store
            .get_credentials(&created.email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert_eq!(hash, "$argon2id$stub");

        let err = store.create_user(new_user("grace@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_set_role() {
        let store = test_support::store().await;
        let created = store.create_user(new_user("admin@example.com")).await.unwrap();

        let promoted = store
            .set_role(&created.email, Role::Admin)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let missing = Email::parse("nobody@example.com").unwrap();
        assert!(store.set_role(&missing, Role::Admin).await.unwrap().is_none());
    }
}
