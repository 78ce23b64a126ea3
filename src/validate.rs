use std::path::Path;

/// The analysis service only accepts PDF documents.
const ACCEPTED_EXTENSION: &str = ".pdf";

/// Pre-flight check run before any network call. Pure and synchronous:
/// every file name must end in the accepted extension (case-insensitive).
/// An empty set passes; the caller treats it as a no-op. On rejection the
/// offending names are returned verbatim for display.
pub fn validate_files<P: AsRef<Path>>(files: &[P]) -> Result<(), Vec<String>> {
    let invalid: Vec<String> = files
        .iter()
        .map(|p| file_name(p.as_ref()))
        .filter(|name| !name.to_lowercase().ends_with(ACCEPTED_EXTENSION))
        .collect();

    if invalid.is_empty() { Ok(()) } else { Err(invalid) }
}

pub fn rejection_message(invalid: &[String]) -> String {
    format!(
        "Please upload only PDF files. Invalid files: {}",
        invalid.join(", ")
    )
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
