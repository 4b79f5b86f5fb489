pub mod analysis;
pub mod dataset;
pub mod error;
pub mod llm_config;
pub mod statistics;
pub mod upload;
