pub mod config;
pub mod content;
pub mod error;
pub mod remote;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::GitdocConfig;
pub use error::{RemoteError, RemoteResult};
pub use remote::RemoteRepo;
pub use types::*;
