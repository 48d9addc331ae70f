use super::*;

#[test]
fn share_stages_are_distinguishable() {
    let auth = ShareError::Auth(BackendError::new("denied"));
    let upload = ShareError::Upload(BackendError::new("503"));
    let permission = ShareError::Permission(BackendError::new("forbidden"));
    assert_eq!(auth.to_string(), "authentication failed: denied");
    assert_eq!(upload.to_string(), "upload failed: 503");
    assert_eq!(permission.to_string(), "could not make file public: forbidden");
}

#[test]
fn user_message_keeps_cause() {
    let err = SessionError::from(CaptureError::Restricted("chrome:// page".into()));
    assert!(err.user_message().contains("chrome:// page"));

    let err = SessionError::from(ShareError::Upload(BackendError::new("quota exceeded")));
    assert!(err.user_message().contains("quota exceeded"));

    let err = SessionError::from(MessagingError::RetriesExhausted { attempts: 5 });
    assert!(err.user_message().contains("5 attempts"));
}

#[test]
fn file_too_large_message_reports_megabytes() {
    let err = SessionError::from(ShareError::FileTooLarge { size: 15 * 1024 * 1024, max: 10 * 1024 * 1024 });
    assert_eq!(err.user_message(), "The image is too large to share (15.0 MB, limit 10.0 MB).");
}

#[test]
fn transparent_display_forwards_inner() {
    let err = SessionError::from(ExportError::Cancelled);
    assert_eq!(err.to_string(), "save cancelled");
    assert_eq!(err.user_message(), "Save cancelled.");
}
