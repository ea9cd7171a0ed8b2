// Watermill batch watermarking library

pub mod batch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod locator;
pub mod logging;
pub mod output;
pub mod watermark;
