//! Transport encoding for images sent to the inference server.

use base64::Engine;

/// Base64-encode raw image bytes for the chat request.
///
/// The result is the bare payload; it never carries a `data:` URL prefix.
pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Strip a `data:<mime>;base64,` prefix from a data URL, returning the
/// base64 payload. Text without a prefix is returned unchanged.
pub fn strip_data_url(text: &str) -> &str {
    match text.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, payload)| payload),
        None => text,
    }
}

/// Sniff the MIME type of an image from its magic bytes.
///
/// Returns `None` when the bytes are not a recognizable image format.
pub fn detect_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}
