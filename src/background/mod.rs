pub mod window_purge;

pub use window_purge::start_window_purge_job;
