//! Row types shared by the extractor, the store and the harvest loop.
//!
//! Field names double as CSV column names, so renaming a field changes the
//! on-disk schema.
use serde::{Deserialize, Deserializer, Serialize};

/// Column order of the posts file.
pub const POST_COLUMNS: [&str; 7] = [
    "id",
    "series",
    "title",
    "post_text",
    "likes",
    "shares",
    "reblogs",
];

/// Column order of the comments file.
pub const COMMENT_COLUMNS: [&str; 2] = ["post_id", "comment"];

/// One post, keyed by `id`.
///
/// `series`, `shares` and `reblogs` default when absent so stores written
/// before those columns existed still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub post_text: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub likes: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub shares: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reblogs: u64,
}

impl PostRecord {
    /// A post with empty text fields and zero counts.
    pub fn new(id: impl Into<String>, series: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            series: series.into(),
            title: String::new(),
            post_text: String::new(),
            likes: 0,
            shares: 0,
            reblogs: 0,
        }
    }
}

/// A reply attached to a post. Not unique; repeated runs append duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub post_id: String,
    #[serde(default)]
    pub comment: String,
}

impl CommentRecord {
    pub fn new(post_id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            comment: comment.into(),
        }
    }
}

/// Everything extracted from one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub posts: Vec<PostRecord>,
    pub comments: Vec<CommentRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountCell {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Accept `12`, `"12"`, `12.0` and empty cells (as 0).
///
/// Dataframe tooling writes integer columns that ever held a missing value
/// as floats, so previously saved stores can carry `5.0` or a blank.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let cell = Option::<CountCell>::deserialize(deserializer)?;
    match cell {
        None => Ok(0),
        Some(CountCell::Int(n)) => Ok(n),
        Some(CountCell::Float(f)) => float_to_count(f).ok_or_else(|| {
            D::Error::custom(format!("count must be a non-negative number, got {f}"))
        }),
        Some(CountCell::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            if let Ok(n) = s.parse::<u64>() {
                return Ok(n);
            }
            s.parse::<f64>()
                .ok()
                .and_then(float_to_count)
                .ok_or_else(|| D::Error::custom(format!("invalid count: {s:?}")))
        }
    }
}

fn float_to_count(f: f64) -> Option<u64> {
    if f.is_finite() && f >= 0.0 {
        Some(f.trunc() as u64)
    } else {
        None
    }
}
