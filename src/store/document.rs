use crate::foundation::value::Descriptor;

/// Free-form JSON attributes attached to a document.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Opaque document payload.
///
/// The store never interprets pixel content. `Bytes` are persisted verbatim; `Image` is a 2-D
/// RGB plane that file stores encode by path suffix and packed-volume stores hold as a slice.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Arbitrary bytes (pre-encoded images, text, raw arrays).
    Bytes(Vec<u8>),
    /// Decoded RGB8 plane.
    Image(image::RgbImage),
}

impl Payload {
    /// Borrow the bytes of a [`Payload::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Image(_) => None,
        }
    }

    /// Borrow the plane of a [`Payload::Image`].
    pub fn as_image(&self) -> Option<&image::RgbImage> {
        match self {
            Self::Image(img) => Some(img),
            Self::Bytes(_) => None,
        }
    }

    /// Byte size of the payload as held in memory.
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::Image(img) => img.as_raw().len(),
        }
    }

    /// `true` for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Self::Bytes(v.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Self::Bytes(v.as_bytes().to_vec())
    }
}

impl From<image::RgbImage> for Payload {
    fn from(v: image::RgbImage) -> Self {
        Self::Image(v)
    }
}

/// The unit of storage: a descriptor plus an optional payload and attributes.
///
/// The descriptor is fixed at construction. Explorers create documents without payload and
/// tracks fill in `data` before the store persists them.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    descriptor: Descriptor,
    /// Payload, absent for metadata-only documents or unreadable files.
    pub data: Option<Payload>,
    /// Application meta-data.
    pub attributes: Option<Attributes>,
    /// Suffix override (including the dot) for the stored file.
    pub extension: Option<String>,
}

impl Document {
    /// Document with no payload.
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            data: None,
            attributes: None,
            extension: None,
        }
    }

    /// Document carrying `data`.
    pub fn with_data(descriptor: Descriptor, data: impl Into<Payload>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::new(descriptor)
        }
    }

    /// The descriptor identifying this document.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Payload bytes, if the payload is [`Payload::Bytes`].
    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_ref().and_then(Payload::as_bytes)
    }

    /// Payload bytes as UTF-8 text, if valid.
    pub fn text(&self) -> Option<&str> {
        self.bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}
