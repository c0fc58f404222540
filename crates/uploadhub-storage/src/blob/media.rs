//! Declared content types and magic-byte sniffing for accepted media.

/// Number of leading bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 32;

const HEIF_BRANDS: [&[u8; 4]; 7] = [b"heic", b"heix", b"hevc", b"hevx", b"heif", b"mif1", b"msf1"];

const MP4_BRANDS: [&[u8; 4]; 12] = [
    b"isom", b"iso2", b"mp41", b"mp42", b"avc1", b"m4v ", b"msnv", b"3gp4", b"3gp5", b"dash",
    b"iso5", b"iso6",
];

/// Media families accepted for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// WebP image.
    Webp,
    /// HEIF/HEIC image.
    Heif,
    /// MPEG-4 video.
    Mp4,
    /// QuickTime video.
    QuickTime,
}

impl MediaKind {
    /// Map a normalized declared content type to its media family.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/heic" | "image/heif" => Some(Self::Heif),
            "video/mp4" => Some(Self::Mp4),
            "video/quicktime" => Some(Self::QuickTime),
            _ => None,
        }
    }

    /// File extension used for stored blobs.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Heif => "heic",
            Self::Mp4 => "mp4",
            Self::QuickTime => "mov",
        }
    }

    /// Identify the media family from the first bytes of a file.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            let brand = header[8..12].to_ascii_lowercase();
            if HEIF_BRANDS.iter().any(|b| b[..] == brand[..]) {
                return Some(Self::Heif);
            }
            if brand == b"qt  " {
                return Some(Self::QuickTime);
            }
            if MP4_BRANDS.iter().any(|b| b[..] == brand[..]) {
                return Some(Self::Mp4);
            }
        }
        None
    }
}
