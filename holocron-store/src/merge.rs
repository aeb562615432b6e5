//! Upsert of a fetched batch into the running store.
use holocron_common::{Batch, CommentRecord, PostRecord};
use std::collections::{HashMap, HashSet};

/// What one merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Batch ids that were not in the store.
    pub inserted: usize,
    /// Batch ids that replaced an existing row.
    pub replaced: usize,
    pub comments_appended: usize,
}

/// Merge `batch` into `posts`/`comments`.
///
/// Posts are keyed by `id`: existing rows first get the batch's `shares`,
/// `reblogs` and `series`, then the batch rows are appended and the whole
/// table is deduplicated keeping the last occurrence. The appended row
/// therefore replaces the stored one entirely. Surviving rows keep the
/// position of their last occurrence.
///
/// Comments are appended as-is.
pub fn merge_batch(
    posts: &mut Vec<PostRecord>,
    comments: &mut Vec<CommentRecord>,
    batch: Batch,
) -> MergeStats {
    let Batch {
        posts: new_posts,
        comments: new_comments,
    } = batch;

    let existing: HashSet<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    let batch_ids: HashSet<&str> = new_posts.iter().map(|p| p.id.as_str()).collect();
    let replaced = batch_ids.iter().filter(|id| existing.contains(*id)).count();
    let inserted = batch_ids.len() - replaced;

    refresh_engagement(posts, &new_posts);

    posts.extend(new_posts);
    dedup_keep_last(posts);

    let comments_appended = new_comments.len();
    comments.extend(new_comments);

    MergeStats {
        inserted,
        replaced,
        comments_appended,
    }
}

/// Copy `shares`, `reblogs` and `series` from the batch onto stored rows with the same id.
fn refresh_engagement(posts: &mut [PostRecord], batch: &[PostRecord]) {
    // Later duplicates inside the batch win, as they do for the full-row append.
    let by_id: HashMap<&str, &PostRecord> = batch.iter().map(|p| (p.id.as_str(), p)).collect();
    for post in posts.iter_mut() {
        if let Some(fresh) = by_id.get(post.id.as_str()) {
            post.shares = fresh.shares;
            post.reblogs = fresh.reblogs;
            post.series.clone_from(&fresh.series);
        }
    }
}

fn dedup_keep_last(posts: &mut Vec<PostRecord>) {
    let last: HashMap<String, usize> = posts
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.id.clone(), idx))
        .collect();
    let mut idx = 0;
    posts.retain(|p| {
        let keep = last.get(&p.id) == Some(&idx);
        idx += 1;
        keep
    });
}
