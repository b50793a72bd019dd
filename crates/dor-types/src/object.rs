use crate::content_type::ContentType;

/// Immutable payload handed to or returned from the repository.
///
/// The repository never interprets `data`; the content type travels beside
/// it and is persisted separately in the sidecar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigitalObject {
    data: Vec<u8>,
    content_type: ContentType,
}

impl DigitalObject {
    pub fn new(data: impl Into<Vec<u8>>, content_type: ContentType) -> Self {
        Self {
            data: data.into(),
            content_type,
        }
    }

    /// Shorthand for a [`ContentType::Binary`] object.
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(data, ContentType::Binary)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (Vec<u8>, ContentType) {
        (self.data, self.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let obj = DigitalObject::new(b"<dc/>".to_vec(), ContentType::DublinCoreMetadata);
        assert_eq!(obj.bytes(), b"<dc/>");
        assert_eq!(obj.content_type(), ContentType::DublinCoreMetadata);
        assert_eq!(obj.len(), 5);
        assert!(!obj.is_empty());
    }

    #[test]
    fn binary_shorthand() {
        let obj = DigitalObject::binary("hello");
        let (data, ct) = obj.into_parts();
        assert_eq!(data, b"hello");
        assert_eq!(ct, ContentType::Binary);
    }

    #[test]
    fn empty_payload_is_allowed() {
        let obj = DigitalObject::binary(Vec::new());
        assert!(obj.is_empty());
    }
}
