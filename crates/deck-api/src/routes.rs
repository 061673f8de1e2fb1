//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::attachments;

/// Create the attachment API router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards/:card_id/attachments", get(attachments::list_attachments))
        .route(
            "/cards/:card_id/attachments/count",
            get(attachments::count_attachments),
        )
        .route("/cards/:card_id/attachment", post(attachments::create_attachment))
        .route(
            "/cards/:card_id/attachment/:attachment_id",
            get(attachments::display_attachment)
                .put(attachments::update_attachment)
                .delete(attachments::delete_attachment),
        )
        .route(
            "/cards/:card_id/attachment/:attachment_id/restore",
            get(attachments::restore_attachment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use deck_attachments::{
        AttachmentConfig, AttachmentService, MemoryAttachmentMapper, MemoryCache, MemoryStorage,
    };
    use deck_auth::{AclEntry, MemoryAcl, Participant};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "deck-test-boundary";

    fn app() -> Router {
        let acl = Arc::new(MemoryAcl::new());
        acl.add_board(1, "alice");
        acl.add_card(7, 1);
        acl.share_board(1, AclEntry::read_only(Participant::User("bob".into())));

        let service = AttachmentService::new(
            Arc::new(MemoryAttachmentMapper::default()),
            acl,
            Arc::new(MemoryCache::new("deck-card-attachments-")),
            Arc::new(MemoryStorage::new()),
            AttachmentConfig::default(),
        );
        router().with_state(AppState::new(Arc::new(service)))
    }

    /// `(name, filename, value)` parts
    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Body {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        Body::from(body)
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Body>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user));
        }
        match body {
            Some(body) => builder
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(body)
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload_report(app: &Router) -> Value {
        let body = multipart(&[
            ("type", None, "deck_file"),
            ("data", None, ""),
            ("file", Some("report.pdf"), "%PDF-1.4"),
        ]);
        let response = app
            .clone()
            .oneshot(request("POST", "/cards/7/attachment", Some("alice"), Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json(response).await
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let response = app()
            .oneshot(request("GET", "/cards/7/attachments", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json(response).await;
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_upload_list_and_count() {
        let app = app();
        let created = upload_report(&app).await;
        assert_eq!(created["type"], "deck_file");
        assert_eq!(created["data"], "report.pdf");
        assert_eq!(created["cardId"], 7);
        assert_eq!(created["createdBy"], "alice");
        assert_eq!(created["deletedAt"], 0);
        assert_eq!(created["extendedData"]["filesize"], 8);

        let response = app
            .clone()
            .oneshot(request("GET", "/cards/7/attachments", Some("bob"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await.as_array().unwrap().len(), 1);

        let response = app
            .oneshot(request("GET", "/cards/7/attachments/count", Some("bob"), None))
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body["cardId"], 7);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_display_sets_headers() {
        let app = app();
        let created = upload_report(&app).await;
        let uri = format!("/cards/7/attachment/{}", created["id"]);

        let response = app
            .oneshot(request("GET", &uri, Some("bob"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"report.pdf\""
        );
        assert_eq!(response.headers()[header::ETAG].len(), 66);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_read_only_user_is_forbidden() {
        let body = multipart(&[("type", None, "link"), ("data", None, "https://example.com")]);
        let response = app()
            .oneshot(request("POST", "/cards/7/attachment", Some("bob"), Some(body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(response).await["status"], 403);
    }

    #[tokio::test]
    async fn test_duplicate_upload_conflicts() {
        let app = app();
        upload_report(&app).await;

        let body = multipart(&[
            ("type", None, "deck_file"),
            ("file", Some("report.pdf"), "again"),
        ]);
        let response = app
            .oneshot(request("POST", "/cards/7/attachment", Some("alice"), Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json(response).await["message"], "File already exists.");
    }

    #[tokio::test]
    async fn test_missing_type_is_bad_request() {
        let body = multipart(&[("data", None, "x")]);
        let response = app()
            .oneshot(request("POST", "/cards/7/attachment", Some("alice"), Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_replaces_data() {
        let app = app();
        let body = multipart(&[("type", None, "link"), ("data", None, "old")]);
        let response = app
            .clone()
            .oneshot(request("POST", "/cards/7/attachment", Some("alice"), Some(body)))
            .await
            .unwrap();
        let created = json(response).await;
        let uri = format!("/cards/7/attachment/{}", created["id"]);

        let response = app
            .oneshot(request(
                "PUT",
                &uri,
                Some("alice"),
                Some(multipart(&[("data", None, "new")])),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["data"], "new");
    }

    #[tokio::test]
    async fn test_delete_and_restore() {
        let app = app();
        let created = upload_report(&app).await;
        let uri = format!("/cards/7/attachment/{}", created["id"]);

        let response = app
            .clone()
            .oneshot(request("DELETE", &uri, Some("alice"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_ne!(json(response).await["deletedAt"], 0);

        let response = app
            .clone()
            .oneshot(request("GET", "/cards/7/attachments?withDeleted=true", Some("alice"), None))
            .await
            .unwrap();
        assert_eq!(json(response).await.as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(request("GET", &format!("{}/restore", uri), Some("alice"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["deletedAt"], 0);

        let response = app
            .oneshot(request("GET", "/cards/7/attachments/count", Some("alice"), None))
            .await
            .unwrap();
        assert_eq!(json(response).await["count"], 1);
    }

    #[tokio::test]
    async fn test_restore_missing_is_forbidden() {
        let response = app()
            .oneshot(request("GET", "/cards/7/attachment/99/restore", Some("alice"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json(response).await["message"],
            "Permission denied: Restore is not allowed."
        );
    }

    #[tokio::test]
    async fn test_unknown_attachment_is_not_found() {
        let response = app()
            .oneshot(request("GET", "/cards/7/attachment/99", Some("alice"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
