use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Model exchange formats the backends can read natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Mps,
    Lp,
}

impl ModelFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        match extension.to_lowercase().as_str() {
            "mps" => Some(ModelFormat::Mps),
            "lp" => Some(ModelFormat::Lp),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid model file name {0:?}")]
    InvalidName(String),

    #[error("unsupported model format {0:?}, expected .mps or .lp")]
    UnsupportedFormat(String),

    #[error("model file is empty")]
    Empty,

    #[error("model file is larger than the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("model {0:?} has not been uploaded")]
    NotFound(String),

    #[error("failed to store model: {0}")]
    Io(#[from] io::Error),
}

/// A model file sitting in the upload directory
#[derive(Debug, Clone, Serialize)]
pub struct StoredModel {
    pub name: String,
    pub format: ModelFormat,
    pub bytes: u64,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Keeps uploaded model files under one directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    size_limit: usize,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>, size_limit: usize) -> Self {
        ModelStore {
            dir: dir.into(),
            size_limit,
        }
    }

    /// Validate and write an uploaded model. A later upload with the same
    /// name replaces the earlier file.
    pub fn store(&self, file_name: &str, contents: &[u8]) -> Result<StoredModel, UploadError> {
        let name = sanitize_file_name(file_name)?;
        let format = ModelFormat::from_file_name(&name)
            .ok_or_else(|| UploadError::UnsupportedFormat(name.clone()))?;

        if contents.is_empty() {
            return Err(UploadError::Empty);
        }
        if contents.len() > self.size_limit {
            return Err(UploadError::TooLarge { limit: self.size_limit });
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&name);
        fs::write(&path, contents)?;
        log::info!("stored model {} ({} bytes)", path.display(), contents.len());

        Ok(StoredModel {
            name,
            format,
            bytes: contents.len() as u64,
            path,
        })
    }

    /// Look up a previously uploaded model by name
    pub fn get(&self, file_name: &str) -> Result<StoredModel, UploadError> {
        let name = sanitize_file_name(file_name)?;
        let format = ModelFormat::from_file_name(&name)
            .ok_or_else(|| UploadError::UnsupportedFormat(name.clone()))?;
        let path = self.dir.join(&name);
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => UploadError::NotFound(name.clone()),
            _ => UploadError::Io(e),
        })?;

        Ok(StoredModel {
            name,
            format,
            bytes: metadata.len(),
            path,
        })
    }
}

/// Reject anything that is not a plain file name. Solvers receive the path
/// on their command line, so whitespace is refused as well.
fn sanitize_file_name(file_name: &str) -> Result<String, UploadError> {
    let valid = !file_name.is_empty()
        && file_name.len() <= 255
        && !file_name.starts_with('.')
        && file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(file_name.to_string())
    } else {
        Err(UploadError::InvalidName(file_name.to_string()))
    }
}
