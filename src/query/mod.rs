//! Query-string decoding shared by the sanitizer, validator and pagination stages

pub mod params;

pub use params::{encode_pairs, object_to_pairs, pairs_to_object, parse_pairs, replace_query};
