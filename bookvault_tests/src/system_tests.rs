use std::time::UNIX_EPOCH;

use bookvault_shelf::api::{RegisterRequest, SavedBook};
use bookvault_shelf::client::ShelfClient;

fn unique_email(prefix: &str) -> String {
    format!(
        "{}{}@example.com",
        prefix,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    )
}

#[tokio::test]
/// Simple test for the bookvault shelf service
/// Registers an account and checks the shelf starts empty
/// Rejects a login with the wrong password
/// Logs in with the right password
/// Saves the same book twice and checks the shelf holds one entry
/// Removes the book and checks the shelf is empty again
/// Checks an anonymous profile read is rejected
async fn bookvault_shelf_e2e_test() {
    let shelf_url = "http://127.0.0.1:3001";
    let shelf_client = ShelfClient::new(shelf_url).expect("Failed to create client");

    let email = unique_email("ada");

    // REGISTER
    let session = shelf_client
        .register(RegisterRequest {
            username: "ada".to_string(),
            email: email.clone(),
            password: "secret123".to_string(),
        })
        .await
        .expect("Failed to register");

    assert!(!session.token.is_empty());
    assert_eq!(session.user.email, email);
    assert!(session.user.saved_books.is_empty());

    // LOGIN with wrong password
    let rejected = shelf_client
        .login(&email, "wrong-password")
        .await
        .expect("Login call failed");
    assert!(rejected.is_none());

    // LOGIN with right password
    let session = shelf_client
        .login(&email, "secret123")
        .await
        .expect("Login call failed")
        .expect("Credentials rejected");

    let book = SavedBook {
        book_id: format!("book-{}", session.user.id),
        title: "title1".to_string(),
        authors: vec!["Author1".to_string()],
        description: "Description1".to_string(),
        image: None,
        link: None,
    };

    // SAVE BOOK
    let profile = shelf_client
        .save_book(&session.token, &book)
        .await
        .expect("Save call failed")
        .expect("Token rejected");
    assert_eq!(profile.book_count, 1);

    // SAVE BOOK again - the shelf keeps a single entry
    let profile = shelf_client
        .save_book(&session.token, &book)
        .await
        .expect("Save call failed")
        .expect("Token rejected");
    assert_eq!(profile.book_count, 1);
    assert_eq!(profile.saved_books[0].book_id, book.book_id);

    // REMOVE BOOK
    let profile = shelf_client
        .remove_book(&session.token, &book.book_id)
        .await
        .expect("Remove call failed")
        .expect("Token rejected");
    assert!(profile
        .saved_books
        .iter()
        .all(|saved| saved.book_id != book.book_id));

    // GET PROFILE
    let profile = shelf_client
        .me(&session.token)
        .await
        .expect("Profile call failed")
        .expect("Token rejected");
    assert_eq!(profile.email, email);
    assert_eq!(profile.book_count, 0);

    // GET PROFILE anonymously
    let anonymous = shelf_client.me("").await.expect("Profile call failed");
    assert!(anonymous.is_none());
}

#[tokio::test]
/// Searches the external catalog through a running server and checks the
/// hits come back in a saveable shape
async fn bookvault_search_e2e_test() {
    let shelf_url = "http://127.0.0.1:3001";
    let shelf_client = ShelfClient::new(shelf_url).expect("Failed to create client");

    let books = shelf_client
        .search_books("the hobbit")
        .await
        .expect("Search call failed");

    assert!(!books.is_empty());
    assert!(books.iter().all(|book| !book.book_id.is_empty()));
}
