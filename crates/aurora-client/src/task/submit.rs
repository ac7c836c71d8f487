//! Turning a selected document into a remote conversion job.

use bytes::Bytes;
use tracing::info;

use crate::error::ClientError;
use crate::transport::ConvertApi;

use super::types::{Engine, Job};

/// Advisory upload cap advertised by the service.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Client-side document checks.
///
/// Advisory filtering only, not a security boundary: the service is the
/// authority and may still reject the upload.
pub(crate) fn validate(file_name: &str, payload: &Bytes) -> Result<(), ClientError> {
    if payload.is_empty() {
        return Err(ClientError::Submission {
            reason: "selected file is empty".to_owned(),
        });
    }
    let looks_like_pdf =
        file_name.to_ascii_lowercase().ends_with(".pdf") || payload.starts_with(b"%PDF-");
    if !looks_like_pdf {
        return Err(ClientError::Submission {
            reason: "only PDF documents are supported".to_owned(),
        });
    }
    if payload.len() > MAX_UPLOAD_BYTES {
        return Err(ClientError::Submission {
            reason: "file exceeds the 100 MB upload limit".to_owned(),
        });
    }
    Ok(())
}

/// Submit `payload` for conversion with the given engine.
///
/// On success returns the immutable [`Job`] anchor; on any failure no job
/// exists and the caller must not begin polling.
pub async fn submit<A: ConvertApi + ?Sized>(
    api: &A,
    file_name: &str,
    payload: Bytes,
    engine: Engine,
) -> Result<Job, ClientError> {
    validate(file_name, &payload)?;

    let resp = api
        .submit(file_name, payload, engine)
        .await
        .map_err(|e| match e {
            // A rejected upload is a submission failure regardless of which
            // layer rejected it.
            ClientError::Request { server_message, .. } => ClientError::Submission {
                reason: server_message,
            },
            other => other,
        })?;

    info!(task_id = %resp.task_id, file = %file_name, %engine, "conversion job accepted");
    Ok(Job {
        task_id: resp.task_id,
        input_name: file_name.to_owned(),
        engine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_bytes() -> Bytes {
        Bytes::from_static(b"%PDF-1.7 minimal")
    }

    #[test]
    fn rejects_empty_payload() {
        let err = validate("doc.pdf", &Bytes::new()).unwrap_err();
        assert!(matches!(err, ClientError::Submission { .. }));
    }

    #[test]
    fn rejects_non_pdf() {
        let err = validate("notes.txt", &Bytes::from_static(b"plain text")).unwrap_err();
        assert!(matches!(err, ClientError::Submission { .. }));
    }

    #[test]
    fn accepts_pdf_by_extension_or_magic() {
        assert!(validate("Doc.PDF", &Bytes::from_static(b"anything")).is_ok());
        assert!(validate("renamed.bin", &pdf_bytes()).is_ok());
    }

    #[test]
    fn rejects_oversize_payload() {
        let oversize = Bytes::from(vec![b'x'; MAX_UPLOAD_BYTES + 1]);
        let err = validate("big.pdf", &oversize).unwrap_err();
        assert!(matches!(err, ClientError::Submission { .. }));
    }
}
