//! Tumblr API integration surface used by the harvest loop.
//!
//! Submodules provide the HTTP client wrapper, typed response models, and the
//! extraction of post/comment rows from decoded posts.
pub mod client;
pub mod extract;
pub mod types;

pub use client::{TagSearch, TumblrApi};
pub use extract::{extract_batch, extract_post};
pub use types::TaggedPost;
