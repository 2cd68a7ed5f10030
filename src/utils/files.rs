/*!
 * Upload classification helpers
 *
 * Decide whether an uploaded file is an image (OCR) or audio
 * (transcription), and clean up client-supplied filenames before they are
 * echoed back or forwarded downstream.
 */

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".tif", ".tiff", ".bmp", ".gif", ".webp"];
const AUDIO_EXTENSIONS: &[&str] = &[".m4a", ".mp3", ".wav", ".ogg", ".oga", ".webm", ".flac", ".aac", ".mp4"];

const MAX_FILENAME_LENGTH: usize = 255;

/// Whether the declared content type or the filename marks the upload as an image
pub fn is_image_upload(filename: &str, content_type: &str) -> bool {
    if let Some(declared) = essence(content_type) {
        return declared.starts_with("image/");
    }
    IMAGE_EXTENSIONS.contains(&extract_extension(filename).as_str())
}

/// Whether the declared content type or the filename marks the upload as audio
pub fn is_audio_upload(filename: &str, content_type: &str) -> bool {
    if let Some(declared) = essence(content_type) {
        // Browsers often label recordings as video/webm or application/octet-stream
        if declared.starts_with("audio/") || declared == "video/webm" {
            return true;
        }
        if declared != "application/octet-stream" {
            return false;
        }
    }
    AUDIO_EXTENSIONS.contains(&extract_extension(filename).as_str())
}

/// Sniff the actual bytes; returns the detected MIME type for known images
pub fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    infer::get(data)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
}

/// Content type to use when the client did not send one
pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Reduce a client-supplied filename to a safe display name.
///
/// Strips directory components, replaces characters that are awkward in
/// multipart headers and drops control characters.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    let mut sanitized = String::with_capacity(base.len());
    for ch in base.chars() {
        match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => sanitized.push('_'),
            _ if ch.is_control() => {}
            _ => sanitized.push(ch),
        }
    }

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return "upload".to_string();
    }

    if sanitized.chars().count() > MAX_FILENAME_LENGTH {
        sanitized = sanitized.chars().take(MAX_FILENAME_LENGTH).collect();
    }
    sanitized
}

/// Extract file extension from filename (lowercased, with leading dot)
fn extract_extension(filename: &str) -> String {
    if let Some(pos) = filename.rfind('.') {
        filename[pos..].to_lowercase()
    } else {
        String::new()
    }
}

/// MIME essence (`type/subtype`, lowercased) or `None` when absent
fn essence(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or("").trim().to_lowercase();
    if essence.is_empty() {
        None
    } else {
        Some(essence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_content_types() {
        assert!(is_image_upload("test.jpg", "image/jpeg"));
        assert!(is_image_upload("scan", "image/png"));
        assert!(is_image_upload("scan.bin", "IMAGE/TIFF; charset=binary"));
    }

    #[test]
    fn test_declared_content_type_wins_over_extension() {
        assert!(!is_image_upload("test.jpg", "text/plain"));
        assert!(!is_image_upload("test.txt", "text/plain"));
    }

    #[test]
    fn test_image_extension_used_without_content_type() {
        assert!(is_image_upload("photo.JPEG", ""));
        assert!(is_image_upload("modern.webp", ""));
        assert!(!is_image_upload("notes.pdf", ""));
        assert!(!is_image_upload("README", ""));
    }

    #[test]
    fn test_audio_detection() {
        assert!(is_audio_upload("test.m4a", "audio/m4a"));
        assert!(is_audio_upload("recording.webm", "video/webm"));
        assert!(is_audio_upload("memo.mp3", "application/octet-stream"));
        assert!(is_audio_upload("memo.WAV", ""));
        assert!(!is_audio_upload("memo.bin", "application/octet-stream"));
        assert!(!is_audio_upload("test.m4a", "image/jpeg"));
    }

    #[test]
    fn test_sniff_png_bytes() {
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert_eq!(sniff_image_type(&png_header), Some("image/png"));
        assert_eq!(sniff_image_type(b"This is not an image"), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("scan.png"), "image/png");
        assert_eq!(guess_content_type("mystery"), "application/octet-stream");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.jpg"), "notes.jpg");
        assert_eq!(sanitize_filename("what?.png"), "what_.png");
        assert_eq!(sanitize_filename("bad\u{0007}name.png"), "badname.png");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename(&"a".repeat(300)).len(), MAX_FILENAME_LENGTH);
    }
}
