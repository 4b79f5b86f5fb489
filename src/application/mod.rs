pub mod use_cases;

pub use use_cases::analysis::AnalyzeUseCase;
pub use use_cases::current_upload::CurrentUpload;
pub use use_cases::upload::UploadUseCase;
