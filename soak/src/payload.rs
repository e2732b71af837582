//! Request bodies sent to the inference endpoint.
use crate::error::SoakError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use soak_core::{MAX_TOKENS, TEMPERATURE};
use std::io::ErrorKind;
use std::path::Path;

/// Base64-encoded image attached to every request.
#[derive(Clone, Debug)]
pub struct ImagePayload {
    format: String,
    data: String,
    size: usize,
}

impl ImagePayload {
    /// Reads and encodes the image at `path`. A missing file is a fatal startup error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SoakError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => SoakError::MissingInput(path.to_path_buf()),
            _ => SoakError::io(path)(err),
        })?;
        Ok(Self::from_bytes(&image_format(path), &bytes))
    }

    pub fn from_bytes(format: &str, bytes: &[u8]) -> Self {
        Self {
            format: format.to_string(),
            data: STANDARD.encode(bytes),
            size: bytes.len(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Size of the raw image in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

fn image_format(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") => "jpeg".to_string(),
        Some(ext) if !ext.is_empty() => ext.to_string(),
        _ => "png".to_string(),
    }
}

/// Template for the `messages-v1` request body.
#[derive(Clone, Debug)]
pub struct PromptPayload {
    image: Option<ImagePayload>,
    max_tokens: u32,
    temperature: f64,
}

impl PromptPayload {
    pub fn text_only() -> Self {
        Self {
            image: None,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    pub fn with_image(image: ImagePayload) -> Self {
        Self {
            image: Some(image),
            ..Self::text_only()
        }
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn body(&self, test_id: &str) -> Value {
        let mut content = Vec::with_capacity(2);
        let prompt = match &self.image {
            Some(image) => {
                content.push(json!({
                    "image": {
                        "format": image.format,
                        "source": { "bytes": image.data },
                    }
                }));
                "What do you see in this image?"
            }
            None => "Reply with a one-sentence greeting.",
        };
        content.push(json!({ "text": format!("{prompt} Test ID: {test_id}") }));

        json!({
            "schemaVersion": "messages-v1",
            "messages": [{ "role": "user", "content": content }],
            "inferenceConfig": {
                "maxTokens": self.max_tokens,
                "temperature": self.temperature,
            },
        })
    }
}
