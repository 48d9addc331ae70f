use std::sync::Mutex;

use super::*;
use crate::error::BackendError;

/// Backend whose stages succeed unless named in `fail`.
#[derive(Default)]
struct MockBackend {
    fail: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    fn failing(stages: &[&'static str]) -> Self {
        Self { fail: stages.to_vec(), ..Self::default() }
    }

    fn outcome(&self, stage: &'static str) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(stage.to_owned());
        if self.fail.contains(&stage) { Err(BackendError::new(format!("{stage} refused"))) } else { Ok(()) }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ShareBackend for MockBackend {
    async fn authenticate(&self, interactive: bool) -> Result<String, BackendError> {
        let stage = if interactive { "auth_interactive" } else { "auth_silent" };
        self.outcome(stage)?;
        Ok(format!("token-{stage}"))
    }

    async fn upload(&self, token: &str, _bytes: &[u8], filename: &str) -> Result<String, BackendError> {
        self.outcome("upload")?;
        assert!(token.starts_with("token-"));
        Ok(format!("id-{filename}"))
    }

    async fn make_public(&self, _token: &str, file_id: &str) -> Result<(), BackendError> {
        assert!(file_id.starts_with("id-"));
        self.outcome("permission")
    }

    async fn link(&self, _token: &str, file_id: &str) -> Result<String, BackendError> {
        self.outcome("link")?;
        Ok(format!("https://share.example/{file_id}"))
    }
}

const MAX: usize = 1024;

#[tokio::test]
async fn happy_path_uses_silent_auth() {
    let backend = MockBackend::default();
    let link = share_image(&backend, &[0u8; 10], "shot.png", MAX).await.unwrap();

    assert_eq!(link, "https://share.example/id-shot.png");
    assert_eq!(backend.calls(), ["auth_silent", "upload", "permission", "link"]);
}

#[tokio::test]
async fn silent_auth_failure_falls_back_to_interactive() {
    let backend = MockBackend::failing(&["auth_silent"]);
    share_image(&backend, &[0u8; 10], "shot.png", MAX).await.unwrap();
    assert_eq!(backend.calls(), ["auth_silent", "auth_interactive", "upload", "permission", "link"]);
}

#[tokio::test]
async fn oversized_file_rejected_before_any_call() {
    let backend = MockBackend::default();
    let err = share_image(&backend, &[0u8; MAX + 1], "big.png", MAX).await.unwrap_err();

    assert!(matches!(err, ShareError::FileTooLarge { size, max } if size == MAX + 1 && max == MAX));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn payload_at_limit_is_accepted() {
    let backend = MockBackend::default();
    assert!(share_image(&backend, &[0u8; MAX], "edge.png", MAX).await.is_ok());
}

#[tokio::test]
async fn each_stage_failure_is_distinguishable() {
    let backend = MockBackend::failing(&["auth_silent", "auth_interactive"]);
    let err = share_image(&backend, &[1], "a.png", MAX).await.unwrap_err();
    assert!(matches!(err, ShareError::Auth(_)));

    let backend = MockBackend::failing(&["upload"]);
    let err = share_image(&backend, &[1], "a.png", MAX).await.unwrap_err();
    assert!(matches!(err, ShareError::Upload(_)));

    let backend = MockBackend::failing(&["permission"]);
    let err = share_image(&backend, &[1], "a.png", MAX).await.unwrap_err();
    assert!(matches!(err, ShareError::Permission(_)));
    assert_eq!(backend.calls(), ["auth_silent", "upload", "permission"]);

    let backend = MockBackend::failing(&["link"]);
    let err = share_image(&backend, &[1], "a.png", MAX).await.unwrap_err();
    assert!(matches!(err, ShareError::Link(ref cause) if cause.0 == "link refused"));
}
