use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Envelope of `GET /v2/tagged`: `{ "meta": {...}, "response": [post, ...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaggedResponse {
    #[serde(default)]
    pub meta: Option<Meta>,
    pub response: Vec<TaggedPost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// One tagged post. Only `id` is required.
///
/// Every other field goes through [`lenient`]: absent, `null`, or present with an
/// unexpected shape all decode to `None`, and the extractor applies the default.
#[derive(Debug, Clone, Deserialize)]
pub struct TaggedPost {
    #[serde(deserialize_with = "post_id")]
    pub id: String,
    /// Default: empty title.
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
    /// Default: empty post text.
    #[serde(default, deserialize_with = "lenient")]
    pub trail: Option<Vec<TrailItem>>,
    /// Default: 0 likes.
    #[serde(default, deserialize_with = "lenient")]
    pub note_count: Option<u64>,
    /// Default: 0 shares and 0 reblogs.
    #[serde(default, deserialize_with = "lenient")]
    pub reblogged_from: Option<RebloggedFrom>,
    /// Default: no comments.
    #[serde(default, deserialize_with = "lenient")]
    pub notes: Option<Vec<Note>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailItem {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
}

// FIXME: confirm against the published post schema whether these counters live here at all;
// the live API may only expose `reblogged_from_id`/`reblogged_from_name`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RebloggedFrom {
    #[serde(default, deserialize_with = "lenient")]
    pub share_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub reblog_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Note {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub reply_text: Option<String>,
}

impl Note {
    pub fn is_reply(&self) -> bool {
        self.kind.as_deref() == Some("reply")
    }
}

/// Decode an optional field, mapping a wrong shape to `None` instead of failing the post.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Post ids arrive as JSON numbers; accept strings too.
fn post_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids() {
        let a: TaggedPost = serde_json::from_value(json!({ "id": 712345678901234567u64 })).unwrap();
        let b: TaggedPost = serde_json::from_value(json!({ "id": "abc" })).unwrap();
        assert_eq!(a.id, "712345678901234567");
        assert_eq!(b.id, "abc");
    }

    #[test]
    fn missing_id_is_an_error() {
        assert!(serde_json::from_value::<TaggedPost>(json!({ "summary": "x" })).is_err());
    }

    #[test]
    fn wrong_shapes_decode_to_none() {
        let post: TaggedPost = serde_json::from_value(json!({
            "id": 1,
            "summary": 42,
            "trail": "not a list",
            "note_count": -1,
            "reblogged_from": "someblog",
            "notes": { "type": "reply" }
        }))
        .unwrap();
        assert!(post.summary.is_none());
        assert!(post.trail.is_none());
        assert!(post.note_count.is_none());
        assert!(post.reblogged_from.is_none());
        assert!(post.notes.is_none());
    }

    #[test]
    fn envelope_decodes() {
        let resp: TaggedResponse = serde_json::from_value(json!({
            "meta": { "status": 200, "msg": "OK" },
            "response": [{ "id": 1 }, { "id": 2, "notes": [{ "type": "like" }] }]
        }))
        .unwrap();
        assert_eq!(resp.response.len(), 2);
        assert_eq!(resp.meta.unwrap().status, Some(200));
        let notes = resp.response[1].notes.as_ref().unwrap();
        assert!(!notes[0].is_reply());
    }
}
