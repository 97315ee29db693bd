pub mod async_wrapper;
pub mod body_limit;
pub mod client;
pub mod logging;

pub use async_wrapper::catch_handler_panics;
pub use body_limit::limit_body_size;
pub use logging::logging_middleware;
