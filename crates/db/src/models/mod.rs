pub mod sync_log;
pub mod sync_run;
pub mod user;
