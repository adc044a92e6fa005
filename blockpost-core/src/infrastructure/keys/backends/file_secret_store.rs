//! Single-key file secret store.
//!
//! The file holds the operator private key as hex text (optionally `0x`-prefixed). On unix the
//! file must not be readable by group or others.

use crate::foundation::OperatorError;
use crate::infrastructure::keys::secret_store::{SecretBytes, SecretName, SecretStore, OPERATOR_KEY_SECRET};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct FileSecretStore {
    file_path: PathBuf,
    key: SecretBytes,
}

impl FileSecretStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, OperatorError> {
        let path = path.as_ref();
        #[cfg(target_family = "unix")]
        Self::validate_file_permissions(path)?;

        let data = tokio::fs::read(path).await.map_err(|e| OperatorError::io(format!("read key file {}", path.display()), e))?;
        let text = String::from_utf8(data)
            .map_err(|_| OperatorError::secret_decode_failed(OPERATOR_KEY_SECRET, "utf8", "key file is not valid utf-8"))?;
        let key = SecretBytes::new(text.trim().as_bytes().to_vec());
        if key.is_empty() {
            return Err(OperatorError::secret_not_found(OPERATOR_KEY_SECRET, "file"));
        }
        log::info!("loaded operator key file path={}", path.display());
        Ok(Self { file_path: path.to_path_buf(), key })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    #[cfg(target_family = "unix")]
    fn validate_file_permissions(path: &Path) -> Result<(), OperatorError> {
        use std::os::unix::fs::MetadataExt;
        let mode =
            std::fs::metadata(path).map_err(|e| OperatorError::io(format!("stat key file {}", path.display()), e))?.mode() & 0o777;
        if mode & 0o077 != 0 {
            return Err(OperatorError::ConfigError(format!(
                "insecure key file permissions path={} mode={:o} (expected 600)",
                path.display(),
                mode
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, name: &SecretName) -> Result<SecretBytes, OperatorError> {
        if name.as_str() == OPERATOR_KEY_SECRET {
            Ok(self.key.clone())
        } else {
            Err(OperatorError::secret_not_found(name.as_str(), "file"))
        }
    }
}
