pub mod browserless;
pub mod cache_store;
pub mod claude;
pub mod run_log;
pub mod serper;
pub mod util;

pub use browserless::BrowserlessSession;
pub use cache_store::{FileCacheStore, MemoryCacheStore};
pub use claude::ClaudeClassifier;
pub use run_log::RunLog;
pub use serper::SerperSearch;
