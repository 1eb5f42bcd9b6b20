pub mod algorithms;
pub mod envelope;
pub mod handle;
pub mod platform;
