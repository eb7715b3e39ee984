pub mod deleted;
pub mod fetcher;
pub mod restore;
pub mod scanner;

pub use deleted::{DeletedFiles, RestoreTicket};
pub use fetcher::fetch_details;
pub use restore::{restore_deleted, RestoreError, RestoreOutcome, RestoreStage};
pub use scanner::{find_deleted, scan};
