pub mod sync_log_repo;
pub mod sync_run_repo;
pub mod user_repo;

pub use sync_log_repo::SyncLogRepo;
pub use sync_run_repo::SyncRunRepo;
pub use user_repo::UserRepo;
