//! Axum extractors for API handlers

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use deck_attachments::AttachmentService;
use deck_auth::CurrentUser;
use std::sync::Arc;

use crate::error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub attachments: Arc<AttachmentService>,
}

impl AppState {
    pub fn new(attachments: Arc<AttachmentService>) -> Self {
        Self { attachments }
    }
}

/// Authenticated user extractor
///
/// The acting user comes from `Authorization: Bearer <uid>`.
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        Ok(AuthenticatedUser(CurrentUser::new(uid)))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
