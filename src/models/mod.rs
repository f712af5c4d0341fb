pub mod caption;
pub mod frame;
pub mod job;
pub mod language;
pub mod report;
