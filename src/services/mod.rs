pub mod analyzer;
pub mod correlation;
pub mod dictionary;
pub mod media;
pub mod pipeline;
pub mod reply;
pub mod transcription;
pub mod vision;
pub mod workspace;
