use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One binary attachment inside a `binary` or `mixed` payload.
///
/// The raw content never appears on the wire directly; it travels base64
/// encoded under the `binary` field. Content is always stored as an owned
/// copy, so a caller mutating its buffer after assignment never affects
/// the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    content: Vec<u8>,

    /// The kind of this attachment, usually just `binary`. Serializes
    /// under `type` and defaults to `binary` at encode time.
    pub kind: Option<String>,

    /// Size of the content in bytes.
    pub size: Option<u64>,

    /// Optional file name.
    pub name: Option<String>,

    /// Content type of the file. The host sets the `Content-Type` header
    /// of the response to this value.
    pub content_type: Option<String>,

    /// Charset of the content, recommended value `utf-8`.
    pub charset: Option<String>,
}

impl File {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw bytes of this file.
    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    /// Replaces the content with a copy of `bytes`.
    ///
    /// Fields the caller has not set explicitly are filled in: the charset
    /// defaults to `utf-8`, the content type is sniffed from the bytes and
    /// the size is computed from the content length.
    pub fn set_content(&mut self, bytes: &[u8]) {
        self.content = bytes.to_vec();
        if self.charset.is_none() {
            self.charset = Some("utf-8".to_string());
        }
        if self.content_type.is_none() {
            // Sniffed types may carry a "; charset=..." suffix, which the
            // host does not expect inside content_type.
            let sniffed = sniff_content_type(bytes);
            let base = sniffed.split(';').next().unwrap_or(&sniffed).trim();
            self.content_type = Some(base.to_string());
        }
        if self.size.is_none() {
            self.size = Some(bytes.len() as u64);
        }
    }

    /// Sets the content to `text` and forces the content type to
    /// `text/plain`.
    pub fn set_plain_text(&mut self, text: &str) {
        self.set_content(text.as_bytes());
        self.content_type = Some("text/plain".to_string());
    }
}

fn sniff_content_type(bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    if std::str::from_utf8(bytes).is_ok() {
        "text/plain; charset=utf-8".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

/// The structure the host actually sends and receives.
#[derive(Serialize, Deserialize)]
struct WireFile {
    binary: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    charset: Option<String>,
}

impl Serialize for File {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = WireFile {
            binary: STANDARD.encode(&self.content),
            kind: self
                .kind
                .clone()
                .unwrap_or_else(|| "binary".to_string()),
            size: self.size,
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            charset: self.charset.clone(),
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for File {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireFile::deserialize(deserializer)?;
        let content = STANDARD.decode(wire.binary.as_bytes()).map_err(|err| {
            D::Error::custom(format!(
                "\"binary\" attribute does not contain a valid base64 string: {err}"
            ))
        })?;

        Ok(File {
            content,
            kind: (!wire.kind.is_empty()).then_some(wire.kind),
            size: wire.size,
            name: wire.name,
            content_type: wire.content_type,
            charset: wire.charset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_plain_text_fills_unset_fields() {
        let mut file = File::new();
        file.set_plain_text("Hello world!");

        assert_eq!(file.charset.as_deref(), Some("utf-8"));
        assert_eq!(file.size, Some(12));
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(file.bytes(), b"Hello world!");
    }

    #[test]
    fn set_content_keeps_caller_fields() {
        let mut file = File {
            content_type: Some("application/my-content-type".to_string()),
            charset: Some("latin-1".to_string()),
            ..File::new()
        };
        file.set_content(b"Hello world!");

        assert_eq!(
            file.content_type.as_deref(),
            Some("application/my-content-type")
        );
        assert_eq!(file.charset.as_deref(), Some("latin-1"));
        assert_eq!(file.size, Some(12));
    }

    #[test]
    fn sniffs_magic_bytes_and_binary_fallback() {
        let mut png = File::new();
        png.set_content(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0]);
        assert_eq!(png.content_type.as_deref(), Some("image/png"));

        let mut opaque = File::new();
        opaque.set_content(&[0xff, 0xfe, 0xfd]);
        assert_eq!(
            opaque.content_type.as_deref(),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn serializes_to_wire_shape() {
        let mut file = File::new();
        file.set_content(b"Hello world!");

        assert_eq!(
            serde_json::to_string(&file).unwrap(),
            r#"{"binary":"SGVsbG8gd29ybGQh","type":"binary","size":12,"content_type":"text/plain","charset":"utf-8"}"#
        );
    }

    #[test]
    fn decodes_from_wire_shape() {
        let input = r#"{
            "binary": "SGVsbG8gd29ybGQh",
            "type": "binary",
            "name": "my-file-1.name",
            "size": 12,
            "content_type": "application/my-content-type-1",
            "charset": "utf-8"
        }"#;

        let file: File = serde_json::from_str(input).unwrap();
        assert_eq!(file.bytes(), b"Hello world!");
        assert_eq!(file.kind.as_deref(), Some("binary"));
        assert_eq!(file.name.as_deref(), Some("my-file-1.name"));
        assert_eq!(
            file.content_type.as_deref(),
            Some("application/my-content-type-1")
        );
    }

    #[test]
    fn round_trip_preserves_content() {
        let mut file = File::new();
        file.set_content(&[0, 1, 2, 253, 254, 255]);

        let encoded = serde_json::to_string(&file).unwrap();
        let decoded: File = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.bytes(), file.bytes());
    }

    #[test]
    fn malformed_base64_fails_decoding() {
        let err =
            serde_json::from_str::<File>(r#"{"binary":"not$base64","type":"binary"}"#).unwrap_err();
        assert!(err.to_string().contains("\"binary\" attribute"));
    }

    #[test]
    fn content_assignment_copies_the_input() {
        let mut buffer = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut file = File::new();
        file.set_content(&buffer);

        buffer.push(10);
        buffer[0] = 0;
        assert_eq!(file.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }
}
