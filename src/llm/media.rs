use std::path::Path;

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub display_name: Option<String>,
}

impl MediaFile {
    pub fn new(bytes: Vec<u8>, display_name: Option<String>) -> Self {
        let mime_type =
            detect_mime_type(&bytes).unwrap_or_else(|| "application/octet-stream".to_string());
        Self {
            bytes,
            mime_type,
            display_name,
        }
    }

    pub async fn read_from(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self::new(bytes, display_name))
    }

    /// MIME type to send inline to the model, or `None` when the model cannot read this file.
    pub fn model_mime_type(&self) -> Option<String> {
        let lowered = self.mime_type.trim().to_ascii_lowercase();
        let normalized = match lowered.as_str() {
            "image/jpg" => "image/jpeg".to_string(),
            _ => lowered,
        };
        matches!(
            normalized.as_str(),
            "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
        )
        .then_some(normalized)
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("image")
    }
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}
