pub mod mock;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod result;
pub mod storage;
pub mod verdict;

#[cfg(test)]
pub mod testing;

pub use pipeline::Analyzer;
pub use request::{AnalysisRequest, UploadedImage};
pub use result::AnalysisResult;
pub use storage::ScratchUploads;
