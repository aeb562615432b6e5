//! Social network clients and extractors used by Holocron.
//!
//! Only the Tumblr tagged-search pipeline exists: a thin client over `/v2/tagged`,
//! typed response models, and the flattening of posts into store rows.
pub mod tumblr;
