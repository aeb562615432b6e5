//! Flatten decoded posts into store rows.
use crate::tumblr::types::TaggedPost;
use holocron_common::{Batch, CommentRecord, PostRecord};

/// Build the post row and reply comments for one post, tagged with `series`.
pub fn extract_post(post: &TaggedPost, series: &str) -> (PostRecord, Vec<CommentRecord>) {
    let post_text = post
        .trail
        .as_deref()
        .and_then(|trail| trail.first())
        .and_then(|item| item.content.clone())
        .unwrap_or_default();

    let (shares, reblogs) = post
        .reblogged_from
        .as_ref()
        .map(|r| (r.share_count.unwrap_or(0), r.reblog_count.unwrap_or(0)))
        .unwrap_or((0, 0));

    let record = PostRecord {
        id: post.id.clone(),
        series: series.to_string(),
        title: post.summary.clone().unwrap_or_default(),
        post_text,
        likes: post.note_count.unwrap_or(0),
        shares,
        reblogs,
    };

    let comments = post
        .notes
        .iter()
        .flatten()
        .filter(|note| note.is_reply())
        .map(|note| CommentRecord::new(post.id.clone(), note.reply_text.clone().unwrap_or_default()))
        .collect();

    (record, comments)
}

/// Extract every post of one fetch, preserving response order.
pub fn extract_batch(posts: &[TaggedPost], series: &str) -> Batch {
    let mut batch = Batch::default();
    batch.posts.reserve(posts.len());
    for post in posts {
        let (record, comments) = extract_post(post, series);
        batch.posts.push(record);
        batch.comments.extend(comments);
    }
    batch
}
