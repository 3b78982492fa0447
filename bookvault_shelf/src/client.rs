use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::api::{AuthResponse, LoginRequest, RegisterRequest, SavedBook, UserProfile};

pub struct ShelfClient {
    url: String,
    client: ClientWithMiddleware,
}

impl ShelfClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls POST /api/account endpoint
    /// Returns the opened session: a bearer token plus the stored profile
    pub async fn register(&self, request: RegisterRequest) -> anyhow::Result<AuthResponse> {
        let response = self
            .client
            .post(format!("{}/api/account", self.url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to register {}", error)
        }

        Ok(response.json().await?)
    }

    /// Calls POST /api/login endpoint
    /// Returns None when the credentials are rejected
    /// and an error in case of any other failure
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<Option<AuthResponse>> {
        let response = self
            .client
            .post(format!("{}/api/login", self.url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to login {}", error)
        }
    }

    /// Calls GET /api/me endpoint with the bearer token
    /// Returns None when the token is missing, expired or invalid
    pub async fn me(&self, token: &str) -> anyhow::Result<Option<UserProfile>> {
        let response = self
            .client
            .get(format!("{}/api/me", self.url))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to get profile {}", error)
        }
    }

    /// Calls POST /api/shelf endpoint
    /// Returns the updated profile, or None when the token is rejected
    pub async fn save_book(
        &self,
        token: &str,
        book: &SavedBook,
    ) -> anyhow::Result<Option<UserProfile>> {
        let response = self
            .client
            .post(format!("{}/api/shelf", self.url))
            .bearer_auth(token)
            .json(book)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to save book {}", error)
        }
    }

    /// Calls DELETE /api/shelf/{book_id} endpoint
    /// Returns the updated profile, or None when the token is rejected
    pub async fn remove_book(
        &self,
        token: &str,
        book_id: &str,
    ) -> anyhow::Result<Option<UserProfile>> {
        let response = self
            .client
            .delete(format!("{}/api/shelf/{}", self.url, book_id))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to remove book {}", error)
        }
    }

    /// Calls GET /api/books/search endpoint
    pub async fn search_books(&self, query: &str) -> anyhow::Result<Vec<SavedBook>> {
        let response = self
            .client
            .get(format!("{}/api/books/search", self.url))
            .query(&[("q", query)])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = response.text().await.unwrap_or_default();
            bail!("Failed to search books {}", error)
        }
    }
}
