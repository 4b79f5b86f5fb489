pub mod analysis;
pub mod current_upload;
pub mod statistics;
pub mod upload;
