pub mod jobs;
pub mod platform;
pub mod throttle;
