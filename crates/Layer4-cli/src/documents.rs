//! Reference document loading
//!
//! UTF-8 파일은 텍스트 문서로, 그 외는 base64 바이너리 문서로 읽습니다.
//! MIME 타입은 확장자로 추정합니다.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use counsel_foundation::ReferenceDocument;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load every path in order
pub async fn load_documents(paths: &[PathBuf]) -> Result<Vec<ReferenceDocument>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_document(path).await?);
    }
    Ok(documents)
}

/// Load one file as a reference document
pub async fn load_document(path: &Path) -> Result<ReferenceDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read document {}", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let guessed = mime_guess::from_path(path);

    let document = match String::from_utf8(bytes) {
        Ok(text) => {
            let mime = guessed
                .first()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "text/plain".to_string());
            ReferenceDocument::text(name, mime, text)
        }
        Err(err) => {
            let mime = guessed.first_or_octet_stream().to_string();
            ReferenceDocument::binary(name, mime, BASE64.encode(err.into_bytes()))
        }
    };

    debug!(
        name = %document.name,
        mime = %document.mime_type,
        binary = document.is_binary(),
        "Loaded document"
    );
    Ok(document)
}
