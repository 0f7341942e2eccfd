use crate::error::{AppError, Result};

/// Maximum accepted file size in bytes (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 6] = [
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "doc", "docx"];

/// Validates a candidate file before any upload work starts.
///
/// Both the declared content type and the filename extension must be in the
/// allowed set, so a mismatch between the claimed type and the extension is
/// rejected as well.
///
/// # Arguments
///
/// * `file_name` - The original filename as uploaded.
/// * `content_type` - The declared MIME type.
/// * `size` - The file size in bytes.
///
/// # Returns
///
/// A `Result<()>` indicating whether the file is acceptable.
pub fn validate_file(file_name: &str, content_type: &str, size: usize) -> Result<()> {
    if size == 0 {
        return Err(AppError::Validation("File cannot be empty".to_string()));
    }

    let valid_content_type =
        ALLOWED_CONTENT_TYPES.contains(&content_type.to_lowercase().as_str());
    let valid_extension =
        ALLOWED_EXTENSIONS.contains(&file_extension(file_name).to_lowercase().as_str());

    if !valid_content_type || !valid_extension {
        return Err(AppError::Validation(
            "Invalid file type. Allowed types: PDF, JPG, JPEG, PNG, DOC, DOCX".to_string(),
        ));
    }

    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "File size exceeds maximum limit of {}",
            format_file_size(MAX_FILE_SIZE)
        )));
    }

    Ok(())
}

/// Returns the extension of a filename, without the dot.
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[idx + 1..],
        None => "",
    }
}

fn format_file_size(size_in_bytes: usize) -> String {
    if size_in_bytes < 1024 {
        format!("{} B", size_in_bytes)
    } else if size_in_bytes < 1024 * 1024 {
        format!("{:.2} KB", size_in_bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size_in_bytes as f64 / (1024.0 * 1024.0))
    }
}
