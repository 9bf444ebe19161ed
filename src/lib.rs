// Library interface for pagescore
// This allows integration tests to access the modules

pub mod batch;
pub mod error;
pub mod network;
pub mod options;
pub mod progress;
pub mod report;
pub mod storage;
pub mod utils;
