#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Mp4,
    Matroska, // MKV/WebM
    TransportStream,
    Unknown,
}

impl ContainerFormat {
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            ContainerFormat::Mp4 => Some("video/mp4"),
            ContainerFormat::Matroska => Some("video/x-matroska"),
            ContainerFormat::TransportStream => Some("video/mp2t"),
            ContainerFormat::Unknown => None,
        }
    }
}

/// Detect container format from the first bytes of a payload.
pub fn detect_container(header: &[u8]) -> ContainerFormat {
    // MP4/MOV: bytes 4..8 == "ftyp"
    if header.len() >= 8 && &header[4..8] == b"ftyp" {
        return ContainerFormat::Mp4;
    }

    // MKV/WebM: EBML magic bytes at offset 0
    if header.len() >= 4 && header[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return ContainerFormat::Matroska;
    }

    // MPEG-TS: sync byte 0x47 at offset 0 and offset 188
    if header.len() > 188 && header[0] == 0x47 && header[188] == 0x47 {
        return ContainerFormat::TransportStream;
    }

    ContainerFormat::Unknown
}

/// Pick the content type to store for a payload.
///
/// A specific declared type wins. A missing or generic
/// `application/octet-stream` declaration falls back to sniffing, then to
/// `fallback`.
pub fn resolve_content_type(declared: Option<&str>, payload: &[u8], fallback: &str) -> String {
    let declared = declared
        .map(|v| v.split(';').next().unwrap_or(v).trim())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("application/octet-stream"));
    if let Some(v) = declared {
        return v.to_string();
    }

    detect_container(payload)
        .mime_type()
        .unwrap_or(fallback)
        .to_string()
}
