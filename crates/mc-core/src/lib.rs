pub mod config;
pub mod documents;
pub mod error;
pub mod io;
pub mod merge;
pub mod paths;
pub mod retry;
pub mod store;
pub mod task;
pub mod version;

pub use error::{McError, Result};
pub use retry::{with_retry, RetryPolicy};
pub use store::Store;
pub use version::Version;
