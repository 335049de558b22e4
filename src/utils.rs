//! Utility functions for file naming and path construction

use std::path::{Path, PathBuf};

/// Extension used when an image URL does not carry a recognised one
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Turn a title into a file-name-safe stem
///
/// Whitespace becomes `_`, as does anything that could escape the target
/// directory or is awkward in a file name (path separators, control and shell
/// characters). Leading dots are replaced so the result is never hidden or a
/// relative path component.
///
/// # Examples
///
/// ```
/// use segment_dl::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("Example Title"), "Example_Title");
/// assert_eq!(sanitize_title("../etc/passwd"), "___etc_passwd");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | '\'' | ',') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let leading_dots = sanitized.chars().take_while(|&c| c == '.').count();
    if leading_dots > 0 {
        sanitized.replace_range(..leading_dots, &"_".repeat(leading_dots));
    }

    if sanitized.is_empty() {
        return "untitled".to_string();
    }
    sanitized
}

/// Location of the assembled document for `title`
#[must_use]
pub fn document_path(documents_dir: &Path, title: &str) -> PathBuf {
    documents_dir.join(format!("{}.pdf", sanitize_title(title)))
}

/// Readable name prefix for the staging directories of `(work, segment)`
///
/// Distinct segments may share a prefix; each run still gets its own
/// directory from [`StagingArea::create_unique`](crate::staging::StagingArea::create_unique).
#[must_use]
pub fn staging_prefix(work: &str, segment: &str) -> String {
    format!("{}-{}", sanitize_title(work), sanitize_title(segment))
}

/// File extension for a staged page, taken from the image URL when recognised
///
/// # Examples
///
/// ```
/// use segment_dl::utils::image_extension;
///
/// assert_eq!(image_extension("https://cdn.example/p/003.PNG?x=1"), "png");
/// assert_eq!(image_extension("https://cdn.example/p/003"), "jpg");
/// ```
#[must_use]
pub fn image_extension(image_url: &str) -> &'static str {
    let Ok(parsed) = url::Url::parse(image_url) else {
        return DEFAULT_IMAGE_EXTENSION;
    };

    let ext = Path::new(parsed.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "png",
        Some("gif") => "gif",
        Some("webp") => "webp",
        Some("jpeg") => "jpeg",
        _ => DEFAULT_IMAGE_EXTENSION,
    }
}
