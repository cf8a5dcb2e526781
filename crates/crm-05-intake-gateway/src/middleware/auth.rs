//! Back-office authentication.
//!
//! Staff authenticate with `Authorization: Bearer <token>` or
//! `X-Staff-Token: <token>`. Tokens are compared in constant time against
//! every configured token, and the matching [`StaffMember`] is attached to
//! the request as an extension.

use crate::domain::error::ApiError;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use crm_types::StaffMember;
use std::fmt;
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

pub const STAFF_TOKEN_HEADER: &str = "x-staff-token";

/// Token-to-staff mapping.
#[derive(Clone, Default)]
pub struct StaffDirectory {
    entries: Vec<(String, StaffMember)>,
}

impl fmt::Debug for StaffDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaffDirectory")
            .field("staff", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl StaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, token: impl Into<String>, member: StaffMember) -> Self {
        self.insert(token, member);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, member: StaffMember) {
        self.entries.push((token.into(), member));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a token. Every entry is compared, match or not.
    pub fn authenticate(&self, token: &str) -> Option<&StaffMember> {
        let mut found = None;
        for (expected, member) in &self.entries {
            if constant_time_compare(token, expected) && found.is_none() {
                found = Some(member);
            }
        }
        found
    }
}

/// Authentication layer
#[derive(Clone)]
pub struct StaffAuthLayer {
    directory: Arc<StaffDirectory>,
}

impl StaffAuthLayer {
    pub fn new(directory: StaffDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
        }
    }
}

impl<S> Layer<S> for StaffAuthLayer {
    type Service = StaffAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        StaffAuthService {
            inner,
            directory: Arc::clone(&self.directory),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct StaffAuthService<S> {
    inner: S,
    directory: Arc<StaffDirectory>,
}

impl<S> Service<Request<Body>> for StaffAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let directory = Arc::clone(&self.directory);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let member = extract_token(&req)
                .and_then(|token| directory.authenticate(token))
                .cloned();

            let Some(member) = member else {
                warn!(path = %req.uri().path(), "Back-office request without a valid staff token");
                return Ok(unauthorized_response());
            };
            if !member.active {
                warn!(staff = %member.username, "Inactive staff member refused");
                return Ok(ApiError::forbidden("This account is disabled.").into_response());
            }

            debug!(staff = %member.username, role = %member.role, "Staff authenticated");
            req.extensions_mut().insert(member);
            inner.call(req).await
        })
    }
}

/// Token from `Authorization: Bearer` or `X-Staff-Token`
fn extract_token<B>(req: &Request<B>) -> Option<&str> {
    if let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim());
    }
    req.headers()
        .get(STAFF_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    // Pad both to the longer length with different bytes so a length
    // difference can never compare equal
    let max_len = std::cmp::max(a.len(), b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

fn unauthorized_response() -> Response {
    let mut response = ApiError::unauthorized().into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}
