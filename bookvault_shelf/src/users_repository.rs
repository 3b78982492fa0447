pub use in_memory_users_repository::InMemoryUsersRepository;
pub use postgres_users_repository::{PostgresUsersRepository, PostgresUsersRepositoryConfig};

use serde::{Deserialize, Serialize};

use crate::api::{SavedBook, UserId, UserProfile};

mod in_memory_users_repository;
mod postgres_users_repository;

#[derive(thiserror::Error, Debug)]
pub enum UsersRepositoryError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Email {0} is already registered")]
    EmailAlreadyRegistered(String),

    #[error("Failed to deserialize user record: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Database failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Fields provided by registration; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A stored account. `saved_books` keeps set semantics keyed by `book_id`
/// with insertion order preserved; both storage backends mutate it through
/// [`UserRecord::add_saved_book`] and [`UserRecord::remove_saved_book`]
/// inside their atomic read-modify-write.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub saved_books: Vec<SavedBook>,
}

impl UserRecord {
    /// Appends the book unless an entry with the same `book_id` is already
    /// present. Re-adding keeps the original entry untouched. Returns whether
    /// the list changed.
    pub fn add_saved_book(&mut self, book: SavedBook) -> bool {
        if self
            .saved_books
            .iter()
            .any(|saved| saved.book_id == book.book_id)
        {
            return false;
        }
        self.saved_books.push(book);
        true
    }

    /// Removes the entry with the given `book_id`; removing a non-member is
    /// a no-op. Returns whether the list changed.
    pub fn remove_saved_book(&mut self, book_id: &str) -> bool {
        let length_before = self.saved_books.len();
        self.saved_books.retain(|saved| saved.book_id != book_id);
        self.saved_books.len() != length_before
    }

    /// Wire projection of the record, without the password hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            book_count: self.saved_books.len(),
            saved_books: self.saved_books.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait UsersRepository: Send + Sync {
    /// Creates an account and returns the stored record with its assigned id.
    /// Fails with [`UsersRepositoryError::EmailAlreadyRegistered`] when the
    /// email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, UsersRepositoryError>;

    /// Looks up an account by id; absence is an ordinary `None`.
    async fn find_user_by_id(&self, id: UserId)
        -> Result<Option<UserRecord>, UsersRepositoryError>;

    /// Looks up an account by email; absence is an ordinary `None`.
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, UsersRepositoryError>;

    /// Atomically adds the book to the user's saved list and returns the
    /// updated record. Saving an already-saved `book_id` changes nothing.
    async fn add_to_saved_books(
        &self,
        user_id: UserId,
        book: SavedBook,
    ) -> Result<UserRecord, UsersRepositoryError>;

    /// Atomically removes the book from the user's saved list and returns
    /// the updated record. Removing a book that is not saved changes nothing.
    async fn pull_from_saved_books(
        &self,
        user_id: UserId,
        book_id: &str,
    ) -> Result<UserRecord, UsersRepositoryError>;
}

#[cfg(test)]
mod user_record_tests {
    use super::*;

    fn book(book_id: &str, title: &str) -> SavedBook {
        SavedBook {
            book_id: book_id.to_string(),
            title: title.to_string(),
            authors: vec!["Author".to_string()],
            description: "Description".to_string(),
            image: None,
            link: None,
        }
    }

    fn record_with_books(saved_books: Vec<SavedBook>) -> UserRecord {
        UserRecord {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            saved_books,
        }
    }

    #[test]
    fn test_add_deduplicates_by_book_id() {
        let mut record = record_with_books(vec![]);

        assert!(record.add_saved_book(book("B1", "First title")));
        assert!(
            !record.add_saved_book(book("B1", "Replacement title")),
            "Same book_id must not be added twice"
        );
        assert!(record.add_saved_book(book("B2", "Second book")));

        assert_eq!(record.saved_books.len(), 2);
        // The losing duplicate must not overwrite the stored entry
        assert_eq!(record.saved_books[0].title, "First title");
        assert_eq!(record.saved_books[1].book_id, "B2");
    }

    #[test]
    fn test_remove_is_noop_for_non_member() {
        let mut record = record_with_books(vec![book("B1", "One"), book("B2", "Two")]);

        assert!(!record.remove_saved_book("B3"));
        assert_eq!(record.saved_books.len(), 2);

        assert!(record.remove_saved_book("B1"));
        assert_eq!(record.saved_books.len(), 1);
        assert_eq!(record.saved_books[0].book_id, "B2");
    }

    #[test]
    fn test_profile_hides_password_hash_and_counts_books() {
        let record = record_with_books(vec![book("B1", "One"), book("B2", "Two")]);

        let profile = record.profile();

        assert_eq!(profile.id, record.id);
        assert_eq!(profile.book_count, 2);
        assert_eq!(profile.saved_books, record.saved_books);
        let serialized = serde_json::to_string(&profile).expect("Failed to serialize profile");
        assert!(!serialized.contains("hash"));
    }
}
