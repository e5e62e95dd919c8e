use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::model::UserContext;

const USER_ID_HEADER: &str = "x-user-id";
const USER_EMAIL_HEADER: &str = "x-user-email";
const USER_NAME_HEADER: &str = "x-user-name";

/// Who is editing the tree, for the audit fields.
///
/// Read from `X-User-Id`, `X-User-Email` and `X-User-Name`. There is no
/// authentication: without a usable `X-User-Id` the development user is used.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(user_from_headers(&parts.headers))
    }
}

fn user_from_headers(headers: &HeaderMap) -> UserContext {
    match header_value(headers, USER_ID_HEADER) {
        Some(user_id) => UserContext::new(user_id)
            .with_email(header_value(headers, USER_EMAIL_HEADER))
            .with_name(header_value(headers, USER_NAME_HEADER)),
        None => UserContext::default_user(),
    }
}

/// Trimmed header value; blank or non-UTF-8 values count as absent
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    #[tokio::test]
    async fn headers_become_user_context() {
        let (mut parts, _) = Request::builder()
            .header("X-User-Id", "grandma-ruth")
            .header("X-User-Email", "ruth@example.com")
            .body(())
            .unwrap()
            .into_parts();

        let user = UserContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_id, "grandma-ruth");
        assert_eq!(user.user_email.as_deref(), Some("ruth@example.com"));
        assert_eq!(user.user_name, None);
    }

    #[test]
    fn blank_user_id_falls_back_to_dev_user() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Someone"));

        assert_eq!(user_from_headers(&headers), UserContext::default_user());
    }
}
