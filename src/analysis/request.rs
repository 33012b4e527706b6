use crate::error::AnalysisError;

pub const DEFAULT_LANGUAGE: &str = "English";

const EMPTY_SUBMISSION_MESSAGE: &str =
    "Please upload at least one prescription image or enter medication details.";

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub images: Vec<UploadedImage>,
    pub note: Option<String>,
    pub language: String,
    pub conditions: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AnalysisRequest {
    pub fn new(
        images: Vec<UploadedImage>,
        note: Option<String>,
        language: Option<String>,
        conditions: Option<String>,
    ) -> Self {
        AnalysisRequest {
            images: images
                .into_iter()
                .filter(|image| !image.bytes.is_empty())
                .collect(),
            note: non_blank(note),
            language: non_blank(language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            conditions: non_blank(conditions),
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.images.is_empty() && self.note.is_none() {
            return Err(AnalysisError::Validation(
                EMPTY_SUBMISSION_MESSAGE.to_string(),
            ));
        }
        Ok(())
    }
}
