pub mod hooks;
pub mod jobs;
