use std::sync::Arc;
use std::time::SystemTime;

use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    AuthResponse, ErrorBody, LoginRequest, RegisterRequest, SavedBook, SearchQuery, UserId,
};
use crate::auth::{password, AuthError, Identity, TokenService};
use crate::book_search_client::BookSearchClient;
use crate::users_repository::{NewUser, UserRecord, UsersRepository, UsersRepositoryError};

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn register(
    users_repository: Data<Arc<dyn UsersRepository>>,
    token_service: Data<TokenService>,
    input: web::Json<RegisterRequest>,
) -> Result<HttpResponse, Error> {
    let input = input.into_inner();

    if input.username.trim().is_empty()
        || input.email.trim().is_empty()
        || input.password.is_empty()
    {
        return Ok(HttpResponse::BadRequest().json(ErrorBody {
            error: "username, email and password must not be empty".to_string(),
        }));
    }

    let password_hash = match password::hash_password(&input.password) {
        Ok(password_hash) => password_hash,
        Err(err) => {
            tracing::error!("Password hashing failed {}", err);
            return Ok(HttpResponse::InternalServerError().finish());
        }
    };

    let new_user = NewUser {
        username: input.username,
        email: input.email,
        password_hash,
    };

    Ok(match users_repository.create_user(new_user).await {
        Ok(record) => session_response(&token_service, &record),
        Err(UsersRepositoryError::EmailAlreadyRegistered(email)) => {
            HttpResponse::Conflict().json(ErrorBody {
                error: format!("Email {} is already registered", email),
            })
        }
        Err(err) => {
            tracing::error!("Register failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    })
}

#[api_v2_operation]
pub async fn login(
    users_repository: Data<Arc<dyn UsersRepository>>,
    token_service: Data<TokenService>,
    input: web::Json<LoginRequest>,
) -> Result<HttpResponse, Error> {
    let input = input.into_inner();

    let record = match users_repository.find_user_by_email(&input.email).await {
        Ok(record) => record,
        Err(err) => {
            tracing::error!("Login lookup failed {}", err);
            return Ok(HttpResponse::InternalServerError().finish());
        }
    };

    // Unknown email and wrong password produce the same rejection
    match record {
        Some(record) if password::verify_password(&input.password, &record.password_hash) => {
            Ok(session_response(&token_service, &record))
        }
        _ => Err(AuthError::NotAuthenticated.into()),
    }
}

#[api_v2_operation]
pub async fn me(
    users_repository: Data<Arc<dyn UsersRepository>>,
    identity: Identity,
) -> Result<HttpResponse, Error> {
    let claims = identity.require()?;

    Ok(match users_repository.find_user_by_id(claims.user_id).await {
        Ok(Some(record)) => HttpResponse::Ok().json(record.profile()),
        Ok(None) => user_not_found(claims.user_id),
        Err(err) => {
            tracing::error!("Me lookup failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    })
}

#[api_v2_operation]
pub async fn save_book(
    users_repository: Data<Arc<dyn UsersRepository>>,
    identity: Identity,
    book: web::Json<SavedBook>,
) -> Result<HttpResponse, Error> {
    // Always the caller's own shelf; the target user never comes from input
    let claims = identity.require()?;

    Ok(
        match users_repository
            .add_to_saved_books(claims.user_id, book.into_inner())
            .await
        {
            Ok(record) => HttpResponse::Ok().json(record.profile()),
            Err(UsersRepositoryError::UserNotFound(user_id)) => user_not_found(user_id),
            Err(err) => {
                tracing::error!("Save book failed {}", err);
                HttpResponse::InternalServerError().finish()
            }
        },
    )
}

#[api_v2_operation]
pub async fn remove_book(
    users_repository: Data<Arc<dyn UsersRepository>>,
    identity: Identity,
    book_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let claims = identity.require()?;

    Ok(
        match users_repository
            .pull_from_saved_books(claims.user_id, &book_id.into_inner())
            .await
        {
            Ok(record) => HttpResponse::Ok().json(record.profile()),
            Err(UsersRepositoryError::UserNotFound(user_id)) => user_not_found(user_id),
            Err(err) => {
                tracing::error!("Remove book failed {}", err);
                HttpResponse::InternalServerError().finish()
            }
        },
    )
}

#[api_v2_operation]
pub async fn search_books(
    book_search_client: Data<BookSearchClient>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    if query.q.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorBody {
            error: "q must not be empty".to_string(),
        }));
    }

    Ok(match book_search_client.search(&query.q).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => {
            tracing::error!("Book search failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    })
}

/// Opens a session for the record: a freshly signed token next to the
/// profile it belongs to. Issuing can only fail on a broken signing setup,
/// reported as a 500.
fn session_response(token_service: &TokenService, record: &UserRecord) -> HttpResponse {
    match token_service.issue(
        record.id,
        &record.username,
        &record.email,
        SystemTime::now(),
    ) {
        Ok(token) => HttpResponse::Ok().json(AuthResponse {
            token,
            user: record.profile(),
        }),
        Err(err) => {
            tracing::error!("Token issuing failed {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn user_not_found(user_id: UserId) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody {
        error: format!("User {} not found", user_id),
    })
}
