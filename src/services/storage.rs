use std::path::{Component, Path, PathBuf};

use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::config::S3Config;

/// Largest accepted lab report upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default lifetime of signed download URLs.
pub const SIGNED_URL_TTL_SECS: u32 = 3600;

/// Object storage for lab report PDFs: an S3-compatible bucket, or a local
/// directory served under `<api prefix>/uploads` when no credentials are set.
pub enum Storage {
    S3 {
        bucket: Box<Bucket>,
    },
    Local {
        root: PathBuf,
        public_prefix: String,
    },
}

impl Storage {
    pub fn s3(config: &S3Config) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?
            .with_path_style();

        Ok(Self::S3 { bucket })
    }

    /// `public_prefix` is the URL path the directory is served at (e.g. `/api/uploads`).
    pub fn local(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self::Local {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Stores `data` under `key` and returns the key.
    pub async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        match self {
            Self::S3 { bucket } => {
                bucket
                    .put_object_with_content_type(key, data, content_type)
                    .await?;
            }
            Self::Local { root, .. } => {
                let path = local_path(root, key)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, data).await?;
            }
        }
        tracing::info!(key = %key, bytes = data.len(), "Stored object");
        Ok(key.to_string())
    }

    /// A time-limited download URL for S3, or the static path for local files.
    pub async fn signed_url(&self, key: &str, expires_secs: u32) -> Result<String, StorageError> {
        match self {
            Self::S3 { bucket } => Ok(bucket.presign_get(key, expires_secs, None).await?),
            Self::Local { public_prefix, .. } => Ok(format!("{public_prefix}/{key}")),
        }
    }

    /// Removes an object. A missing local file is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::S3 { bucket } => {
                bucket.delete_object(key).await?;
            }
            Self::Local { root, .. } => {
                let path = local_path(root, key)?;
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}

/// `lab-reports/<batch>/<millis>-<filename>` with whitespace and path separators replaced by `-`.
pub fn lab_report_key(batch_id: &str, filename: &str, millis: i64) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '-'
            } else {
                c
            }
        })
        .collect();
    format!("lab-reports/{batch_id}/{millis}-{safe}")
}

/// Accepts `application/pdf` uploads, or any upload whose bytes start with the PDF magic.
pub fn is_pdf(content_type: Option<&str>, data: &[u8]) -> bool {
    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    declared || data.starts_with(b"%PDF-")
}

fn local_path(root: &Path, key: &str) -> Result<PathBuf, StorageError> {
    let relative = Path::new(key);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(root.join(relative))
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Local storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_report_key() {
        assert_eq!(
            lab_report_key("AMR-001", "fat test jan.pdf", 1_700_000_000_000),
            "lab-reports/AMR-001/1700000000000-fat-test-jan.pdf"
        );
        assert_eq!(
            lab_report_key("AMR-001", "../etc/passwd", 1),
            "lab-reports/AMR-001/1-..-etc-passwd"
        );
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Some("application/pdf"), b""));
        assert!(is_pdf(Some("Application/PDF; charset=binary"), b""));
        assert!(is_pdf(Some("application/octet-stream"), b"%PDF-1.7\n"));
        assert!(!is_pdf(Some("image/png"), b"\x89PNG"));
        assert!(!is_pdf(None, b"hello"));
    }

    #[test]
    fn test_local_path_rejects_traversal() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            local_path(root, "lab-reports/AMR-001/1-a.pdf").unwrap(),
            PathBuf::from("/srv/uploads/lab-reports/AMR-001/1-a.pdf")
        );
        assert!(local_path(root, "../secrets").is_err());
        assert!(local_path(root, "/etc/passwd").is_err());
        assert!(local_path(root, "").is_err());
    }

    #[tokio::test]
    async fn test_local_upload_and_delete() {
        let root = std::env::temp_dir().join(format!("amrytum-storage-{}", uuid::Uuid::new_v4()));
        let storage = Storage::local(&root, "/api/uploads/");
        let key = lab_report_key("AMR-009", "report.pdf", 42);

        storage.upload(&key, b"%PDF-1.4", "application/pdf").await.unwrap();
        assert_eq!(tokio::fs::read(root.join(&key)).await.unwrap(), b"%PDF-1.4");
        assert_eq!(
            storage.signed_url(&key, SIGNED_URL_TTL_SECS).await.unwrap(),
            "/api/uploads/lab-reports/AMR-009/42-report.pdf"
        );

        storage.delete(&key).await.unwrap();
        storage.delete(&key).await.unwrap();
        assert!(!root.join(&key).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
