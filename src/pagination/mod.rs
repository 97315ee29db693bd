//! Pagination resolution and response shaping
//!
//! Clients address a page either by `page` or by `offset`; both resolve to
//! the same [`PaginationDescriptor`].

pub mod middleware;
pub mod resolver;
pub mod responder;

pub use middleware::{resolve_pagination, Pagination};
pub use resolver::{resolve, PaginationDescriptor, PaginationPolicy, SortOrder};
pub use responder::{apply_headers, link_header, Paginated, PaginationMeta};
