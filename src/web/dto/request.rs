//! Form submission extraction.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        multipart::{Field, MultipartError},
        FromRequest, Multipart, Request,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    Form,
};
use bytes::BytesMut;
use utoipa::ToSchema;

use super::NoticeFormat;
use crate::config::UploadConfig;
use crate::mail::{Attachment, MailSubmission, SmtpOverrides};
use crate::web::error::FormRejection;
use crate::web::handlers::AppState;

/// Name of the multipart file field.
pub const ATTACHMENTS_FIELD: &str = "attachments";

/// Contact form fields, as documented in the OpenAPI schema.
#[derive(Debug, ToSchema)]
pub struct SendEmailForm {
    /// Sender display name.
    pub name: String,
    /// Reply address of the submitter.
    pub email: String,
    pub subject: String,
    pub message: String,
    /// Comma separated recipient addresses.
    pub recipients: String,
    /// Files to attach (repeat the field, up to 5 files of 10 MiB each).
    #[schema(value_type = Option<Vec<String>>, format = Binary)]
    pub attachments: Option<Vec<Vec<u8>>>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    /// `"true"` for implicit TLS.
    pub smtp_secure: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
}

/// Extractor for a contact form submission.
///
/// Accepts `multipart/form-data` (with attachments) and
/// `application/x-www-form-urlencoded`. Attachment count and size limits are
/// enforced while the body is read.
pub struct MailForm(pub MailSubmission);

#[async_trait]
impl FromRequest<Arc<AppState>> for MailForm {
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let format = NoticeFormat::from_headers(req.headers());
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                FormRejection::bad_request(format!("Invalid form data: {}", e.body_text()), format)
            })?;
            let (fields, attachments) = read_multipart(multipart, &state.upload, format).await?;
            return Ok(MailForm(into_submission(fields, attachments)));
        }

        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|e| {
                FormRejection::bad_request(format!("Invalid form data: {}", e.body_text()), format)
            })?;
        Ok(MailForm(into_submission(fields, Vec::new())))
    }
}

/// Read text fields and file parts from a multipart body.
async fn read_multipart(
    mut multipart: Multipart,
    limits: &UploadConfig,
    format: NoticeFormat,
) -> Result<(HashMap<String, String>, Vec<Attachment>), FormRejection> {
    let mut fields = HashMap::new();
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Failed to read multipart field: {}", e);
        multipart_rejection(e, format)
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == ATTACHMENTS_FIELD {
            let filename = field.file_name().unwrap_or("").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let content = read_limited(field, &filename, limits, format).await?;

            // An empty file input still sends a part.
            if filename.is_empty() && content.is_empty() {
                continue;
            }

            if attachments.len() >= limits.max_files {
                return Err(FormRejection::payload_too_large(
                    format!("Too many files (max {})", limits.max_files),
                    format,
                ));
            }

            attachments.push(Attachment {
                filename,
                content: content.freeze(),
                content_type,
            });
        } else {
            let value = field.text().await.map_err(|e| {
                FormRejection::bad_request(format!("Invalid field {name}: {}", e.body_text()), format)
            })?;
            fields.insert(name, value);
        }
    }

    Ok((fields, attachments))
}

/// Read a file part, failing as soon as it exceeds the size limit.
async fn read_limited(
    mut field: Field<'_>,
    filename: &str,
    limits: &UploadConfig,
    format: NoticeFormat,
) -> Result<BytesMut, FormRejection> {
    let max = limits.max_file_size_bytes();
    let mut content = BytesMut::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_rejection(e, format))?
    {
        if content.len() + chunk.len() > max {
            return Err(FormRejection::payload_too_large(
                format!(
                    "File too large: {} (max {}MB)",
                    filename, limits.max_file_size_mb
                ),
                format,
            ));
        }
        content.extend_from_slice(&chunk);
    }

    Ok(content)
}

/// Map a multipart read error, keeping body limit failures as 413.
fn multipart_rejection(err: MultipartError, format: NoticeFormat) -> FormRejection {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FormRejection::payload_too_large("Request body too large", format)
    } else {
        FormRejection::bad_request(format!("Invalid form data: {}", err.body_text()), format)
    }
}

/// Map form field names onto a submission.
fn into_submission(
    mut fields: HashMap<String, String>,
    attachments: Vec<Attachment>,
) -> MailSubmission {
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();

    let name = take("name");
    let sender_email = take("email");
    let subject = take("subject");
    let message = take("message");
    let recipients = take("recipients");

    MailSubmission {
        name,
        sender_email,
        subject,
        message,
        recipients,
        attachments,
        overrides: SmtpOverrides {
            host: fields.remove("smtp_host"),
            port: fields.remove("smtp_port"),
            secure: fields.remove("smtp_secure"),
            user: fields.remove("smtp_user"),
            pass: fields.remove("smtp_pass"),
        },
    }
}
