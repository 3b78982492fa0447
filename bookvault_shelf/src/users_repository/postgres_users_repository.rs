use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Statement};

use crate::api::{SavedBook, UserId};
use crate::users_repository::{NewUser, UserRecord, UsersRepository, UsersRepositoryError};

pub struct PostgresUsersRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

/// JSONB payload of the `record` column. The id and email live in their own
/// columns: the id is store-assigned and the email carries the uniqueness
/// constraint.
#[derive(Debug, Serialize, Deserialize)]
struct AccountDocument {
    username: String,
    password_hash: String,
    saved_books: Vec<SavedBook>,
}

impl From<&UserRecord> for AccountDocument {
    fn from(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            password_hash: record.password_hash.clone(),
            saved_books: record.saved_books.clone(),
        }
    }
}

pub struct PostgresUsersRepository {
    // Shelf mutations run in a transaction with SELECT ... FOR UPDATE, and
    // Client::transaction needs exclusive access to the connection.
    client: tokio::sync::Mutex<Client>,
}

impl PostgresUsersRepository {
    pub async fn init(config: PostgresUsersRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Connecting to postgres at {}", config.hostname);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS accounts (
            id              SERIAL PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            record          JSONB NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup accounts table")?;

        Ok(Self {
            client: tokio::sync::Mutex::new(client),
        })
    }

    fn record_from_columns(
        id: UserId,
        email: String,
        value: serde_json::Value,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let document: AccountDocument = serde_json::from_value(value)?;

        Ok(UserRecord {
            id,
            username: document.username,
            email,
            password_hash: document.password_hash,
            saved_books: document.saved_books,
        })
    }
}

#[async_trait::async_trait]
impl UsersRepository for PostgresUsersRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, UsersRepositoryError> {
        let client = self.client.lock().await;

        let stmt: Statement = client
            .prepare("INSERT INTO accounts (email, record) VALUES ($1, $2) RETURNING id")
            .await?;

        let document = AccountDocument {
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            saved_books: vec![],
        };

        let rows = client
            .query(&stmt, &[&new_user.email, &json!(document)])
            .await;

        match rows {
            Ok(rows) => {
                let id: UserId = rows
                    .first()
                    .ok_or_else(|| UsersRepositoryError::Other("Id not returned".to_string()))?
                    .try_get(0)?;

                Ok(UserRecord {
                    id,
                    username: new_user.username,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    saved_books: vec![],
                })
            }
            Err(err)
                if err
                    .as_db_error()
                    .map(|db_err| db_err.code() == &SqlState::UNIQUE_VIOLATION)
                    .unwrap_or_default() =>
            {
                Err(UsersRepositoryError::EmailAlreadyRegistered(new_user.email))
            }
            Err(other_err) => Err(other_err.into()),
        }
    }

    async fn find_user_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<UserRecord>, UsersRepositoryError> {
        let client = self.client.lock().await;

        let stmt: Statement = client
            .prepare("SELECT email, record FROM accounts WHERE id = ($1)")
            .await?;

        let rows = client.query(&stmt, &[&id]).await?;

        match rows.first() {
            None => Ok(None),
            Some(row) => Ok(Some(Self::record_from_columns(
                id,
                row.try_get(0)?,
                row.try_get(1)?,
            )?)),
        }
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, UsersRepositoryError> {
        let client = self.client.lock().await;

        let stmt: Statement = client
            .prepare("SELECT id, record FROM accounts WHERE email = ($1)")
            .await?;

        let rows = client.query(&stmt, &[&email]).await?;

        match rows.first() {
            None => Ok(None),
            Some(row) => {
                let id: UserId = row.try_get(0)?;
                Ok(Some(Self::record_from_columns(
                    id,
                    email.to_string(),
                    row.try_get(1)?,
                )?))
            }
        }
    }

    async fn add_to_saved_books(
        &self,
        user_id: UserId,
        book: SavedBook,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let mut client = self.client.lock().await;
        let transaction = client.transaction().await?;

        let stmt: Statement = transaction
            .prepare("SELECT email, record FROM accounts WHERE id = ($1) FOR UPDATE")
            .await?;
        let rows = transaction.query(&stmt, &[&user_id]).await?;
        let row = rows
            .first()
            .ok_or(UsersRepositoryError::UserNotFound(user_id))?;

        let mut record = Self::record_from_columns(user_id, row.try_get(0)?, row.try_get(1)?)?;

        if record.add_saved_book(book) {
            let stmt: Statement = transaction
                .prepare("UPDATE accounts SET record = $2 WHERE id = $1")
                .await?;
            transaction
                .execute(&stmt, &[&user_id, &json!(AccountDocument::from(&record))])
                .await?;
        }

        transaction.commit().await?;

        Ok(record)
    }

    async fn pull_from_saved_books(
        &self,
        user_id: UserId,
        book_id: &str,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let mut client = self.client.lock().await;
        let transaction = client.transaction().await?;

        let stmt: Statement = transaction
            .prepare("SELECT email, record FROM accounts WHERE id = ($1) FOR UPDATE")
            .await?;
        let rows = transaction.query(&stmt, &[&user_id]).await?;
        let row = rows
            .first()
            .ok_or(UsersRepositoryError::UserNotFound(user_id))?;

        let mut record = Self::record_from_columns(user_id, row.try_get(0)?, row.try_get(1)?)?;

        if record.remove_saved_book(book_id) {
            let stmt: Statement = transaction
                .prepare("UPDATE accounts SET record = $2 WHERE id = $1")
                .await?;
            transaction
                .execute(&stmt, &[&user_id, &json!(AccountDocument::from(&record))])
                .await?;
        }

        transaction.commit().await?;

        Ok(record)
    }
}
