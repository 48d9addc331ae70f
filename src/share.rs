//! Share pipeline: size check, authenticate, upload, publish, link.

use crate::error::ShareError;
use crate::services::ShareBackend;

#[cfg(test)]
#[path = "share_test.rs"]
mod share_test;

/// Upload `bytes` and return a public link.
///
/// Oversized payloads are rejected before the backend is touched.
/// Authentication is tried silently first; the interactive prompt is used
/// only when the silent attempt fails.
///
/// # Errors
///
/// Returns the [`ShareError`] variant for whichever stage failed.
pub async fn share_image(
    backend: &dyn ShareBackend,
    bytes: &[u8],
    filename: &str,
    max_bytes: usize,
) -> Result<String, ShareError> {
    if bytes.len() > max_bytes {
        tracing::info!(bytes = bytes.len(), max_bytes, "share rejected: file too large");
        return Err(ShareError::FileTooLarge { size: bytes.len(), max: max_bytes });
    }

    let token = match backend.authenticate(false).await {
        Ok(token) => token,
        Err(e) => {
            tracing::debug!(error = %e, "silent auth failed; prompting");
            backend.authenticate(true).await.map_err(ShareError::Auth)?
        }
    };

    let file_id = backend.upload(&token, bytes, filename).await.map_err(ShareError::Upload)?;
    tracing::info!(%file_id, bytes = bytes.len(), "share: uploaded");

    backend.make_public(&token, &file_id).await.map_err(ShareError::Permission)?;
    let link = backend.link(&token, &file_id).await.map_err(ShareError::Link)?;
    tracing::info!(%file_id, "share: link ready");
    Ok(link)
}
