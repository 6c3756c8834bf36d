use std::path::Path;

/// Validation errors for attachment files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Missing file extension (filename: {0})")]
    MissingExtension(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Attachment validator
///
/// Checks size and extension of a file before it is bound to a slot, so that
/// obviously unusable files are rejected before any gateway call.
#[derive(Debug, Clone)]
pub struct AttachmentValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl AttachmentValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
        }
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validates the extension and returns it lowercased, without the dot.
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    pub fn validate_all(&self, filename: &str, file_size: usize) -> Result<String, ValidationError> {
        self.validate_file_size(file_size)?;
        self.validate_extension(filename)
    }
}
