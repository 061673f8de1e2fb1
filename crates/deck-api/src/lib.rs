//! # deck-api
//!
//! REST API handlers for Deck RS.
//!
//! Card attachment endpoints on top of
//! [`AttachmentService`](deck_attachments::AttachmentService).

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use extractors::AppState;
pub use routes::router;
