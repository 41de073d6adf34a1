use crate::models::ResourceType;

/// Sniff a content type from leading magic bytes, falling back to a generic
/// type for the resource kind.
pub fn detect_media_mime(bytes: &[u8], resource_type: ResourceType) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        [_, _, _, _, 0x66, 0x74, 0x79, 0x70, 0x71, 0x74, ..] => "video/quicktime",
        [_, _, _, _, 0x66, 0x74, 0x79, 0x70, ..] => "video/mp4",
        [0x1A, 0x45, 0xDF, 0xA3, ..] => "video/webm",
        _ => {
            let fallback = match resource_type {
                ResourceType::Image => "image/png",
                ResourceType::Video => "video/mp4",
            };
            tracing::warn!(
                "Unrecognized {} format (first 4 bytes: {:02X?}), falling back to {}",
                resource_type.as_str(),
                &bytes[..bytes.len().min(4)],
                fallback
            );
            fallback
        }
    }
}

/// File extension matching a content type returned by [`detect_media_mime`].
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => "mp4",
    }
}
