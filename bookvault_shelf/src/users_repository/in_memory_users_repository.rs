use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::api::{SavedBook, UserId};
use crate::users_repository::{NewUser, UserRecord, UsersRepository, UsersRepositoryError};

pub struct InMemoryUsersRepository {
    users: parking_lot::RwLock<HashMap<UserId, UserRecord>>,
    user_sequence_generator: AtomicI32,
}

impl Default for InMemoryUsersRepository {
    fn default() -> Self {
        Self {
            users: Default::default(),
            user_sequence_generator: Default::default(),
        }
    }
}

#[async_trait::async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, UsersRepositoryError> {
        // Uniqueness scan and insert under one write lock
        let mut locked_users = self.users.write();

        if locked_users
            .values()
            .any(|record| record.email == new_user.email)
        {
            return Err(UsersRepositoryError::EmailAlreadyRegistered(new_user.email));
        }

        let id = self.user_sequence_generator.fetch_add(1, Ordering::Relaxed);
        let record = UserRecord {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            saved_books: vec![],
        };
        locked_users.insert(id, record.clone());

        Ok(record)
    }

    async fn find_user_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<UserRecord>, UsersRepositoryError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, UsersRepositoryError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|record| record.email == email)
            .cloned())
    }

    async fn add_to_saved_books(
        &self,
        user_id: UserId,
        book: SavedBook,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let mut locked_users = self.users.write();

        let record = locked_users
            .get_mut(&user_id)
            .ok_or(UsersRepositoryError::UserNotFound(user_id))?;
        record.add_saved_book(book);

        Ok(record.clone())
    }

    async fn pull_from_saved_books(
        &self,
        user_id: UserId,
        book_id: &str,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let mut locked_users = self.users.write();

        let record = locked_users
            .get_mut(&user_id)
            .ok_or(UsersRepositoryError::UserNotFound(user_id))?;
        record.remove_saved_book(book_id);

        Ok(record.clone())
    }
}
