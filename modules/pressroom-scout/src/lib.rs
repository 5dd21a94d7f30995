pub mod cache;
pub mod candidates;
pub mod classifier;
pub mod discovery;
pub mod error;
pub mod infra;
pub mod prompts;
pub mod scout;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod verification;
