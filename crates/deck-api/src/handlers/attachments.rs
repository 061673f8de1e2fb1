//! Card attachment API handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use deck_attachments::{Attachment, Upload};
use deck_core::traits::Id;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub with_deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub card_id: Id,
    pub count: u64,
}

/// Fields of an attachment form
#[derive(Debug, Default)]
struct AttachmentForm {
    attachment_type: Option<String>,
    data: String,
    upload: Option<Upload>,
}

impl AttachmentForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = AttachmentForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "type" => form.attachment_type = Some(field.text().await?),
                "data" => form.data = field.text().await?,
                "file" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content: Bytes = field.bytes().await?;
                    form.upload = Some(Upload::new(filename, content));
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

/// List attachments of a card
///
/// GET /cards/:card_id/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Attachment>>> {
    let attachments = state
        .attachments
        .find_all(&user, card_id, params.with_deleted)
        .await?;
    Ok(Json(attachments))
}

/// Number of attachments on a card
///
/// GET /cards/:card_id/attachments/count
pub async fn count_attachments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<CountResponse>> {
    let count = state.attachments.count(&user, card_id).await?;
    Ok(Json(CountResponse { card_id, count }))
}

/// Create an attachment
///
/// POST /cards/:card_id/attachment
pub async fn create_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = AttachmentForm::read(multipart).await?;
    let attachment_type = form
        .attachment_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing attachment type"))?;

    let attachment = state
        .attachments
        .create_with_upload(&user, card_id, &attachment_type, &form.data, form.upload)
        .await?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

/// Display an attachment's content
///
/// GET /cards/:card_id/attachment/:attachment_id
pub async fn display_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((card_id, attachment_id)): Path<(Id, Id)>,
) -> ApiResult<impl IntoResponse> {
    let content = state
        .attachments
        .display(&user, card_id, attachment_id)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, content.content_type.clone()),
        (header::CONTENT_DISPOSITION, content.content_disposition()),
        (header::ETAG, format!("\"{}\"", content.etag())),
    ];
    Ok((headers, content.content))
}

/// Replace an attachment's payload
///
/// PUT /cards/:card_id/attachment/:attachment_id
pub async fn update_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((card_id, attachment_id)): Path<(Id, Id)>,
    multipart: Multipart,
) -> ApiResult<Json<Attachment>> {
    let form = AttachmentForm::read(multipart).await?;
    let attachment = state
        .attachments
        .update_with_upload(&user, card_id, attachment_id, &form.data, form.upload)
        .await?;
    Ok(Json(attachment))
}

/// Delete an attachment
///
/// DELETE /cards/:card_id/attachment/:attachment_id
pub async fn delete_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((card_id, attachment_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Attachment>> {
    let attachment = state
        .attachments
        .delete(&user, card_id, attachment_id)
        .await?;
    Ok(Json(attachment))
}

/// Undo a soft delete
///
/// GET /cards/:card_id/attachment/:attachment_id/restore
pub async fn restore_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((card_id, attachment_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Attachment>> {
    let attachment = state
        .attachments
        .restore(&user, card_id, attachment_id)
        .await?;
    Ok(Json(attachment))
}
