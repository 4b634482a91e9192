//! Authentication middleware (middleware placement).

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{attach_principal, Authenticator, PeerIdentity, Principal, Transport};
use crate::http::request::credentials;
use crate::http::response::ApiError;

/// Authenticate the request and insert its [`Principal`] extension.
///
/// A request that already carries a principal is passed through untouched.
pub async fn auth_middleware(
    State(authenticator): State<Authenticator>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.extensions().get::<Principal>().is_some() {
        return next.run(req).await;
    }

    let creds = credentials(req.headers(), req.extensions().get::<PeerIdentity>());
    match authenticator.authenticate(Transport::Http, &creds) {
        Ok(principal) => {
            attach_principal(req.extensions_mut(), principal);
            next.run(req).await
        }
        Err(denied) => ApiError::PermissionDenied(denied.error_id).into_response(),
    }
}
