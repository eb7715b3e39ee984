pub mod cache;
pub mod context;
pub mod loader;
pub mod monitor;
pub mod notify;

pub use cache::{FileSessionStore, MemorySessionStore, SessionStore, SnapshotCache};
pub use context::SyncContext;
pub use loader::{FileLoader, LoadGuard, LoadResult, OpenFile};
pub use monitor::{watch, CheckOutcome, MonitorState, StalenessMonitor, Wake};
pub use notify::{CollectNotifier, LogNotifier, Notice, Notifier};
