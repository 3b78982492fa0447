use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError};
use paperclip::actix::Apiv2Security;

use crate::api::ErrorBody;
use crate::auth::token::{Claims, TokenService};

/// Returned by [`Identity::require`] when an operation needs an
/// authenticated user and the request carried no valid credential. The
/// message does not reveal whether the credential was absent, malformed,
/// tampered with or expired.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not Authenticated")]
    NotAuthenticated,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Per-request identity: which user, if any, presented a valid token.
///
/// Extraction never rejects the request. A missing or invalid credential
/// only means downstream handlers see an anonymous identity; handlers that
/// need a user call [`Identity::require`] before touching user-owned state.
#[derive(Debug, Clone, Apiv2Security)]
#[openapi(
    apiKey,
    alias = "BearerToken",
    in = "header",
    name = "Authorization",
    description = "Use format 'Bearer TOKEN'"
)]
pub struct Identity(Option<Claims>);

impl Identity {
    pub fn authenticated(claims: Claims) -> Self {
        Self(Some(claims))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref()
    }

    pub fn require(&self) -> Result<&Claims, AuthError> {
        self.0.as_ref().ok_or(AuthError::NotAuthenticated)
    }
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(identity_from_request(req)))
    }
}

fn identity_from_request(req: &HttpRequest) -> Identity {
    let Some(token) = presented_token(req) else {
        return Identity::anonymous();
    };

    let Some(token_service) = req.app_data::<Data<TokenService>>() else {
        tracing::error!("TokenService app data is not configured");
        return Identity::anonymous();
    };

    match token_service.verify(&token) {
        Ok(claims) => Identity::authenticated(claims),
        Err(reason) => {
            tracing::debug!("Discarding bearer credential: {}", reason);
            Identity::anonymous()
        }
    }
}

/// Pulls the raw token from the `Authorization: Bearer <token>` header,
/// falling back to a `token` query parameter for clients that cannot set
/// headers. A header that is not a usable Bearer credential does not block
/// the query fallback.
fn presented_token(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            let parts: Vec<&str> = value.split_whitespace().collect();
            if parts.len() == 2 && parts[0] == "Bearer" {
                return Some(parts[1].to_string());
            }
        }
    }

    req.query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}
