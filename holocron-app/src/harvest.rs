//! One harvest run: load the key and store, fetch every series, merge, persist.
//!
//! Everything is sequential. Any failure aborts the run before [`Store::persist`],
//! so the files on disk are only ever replaced by a run that fetched every series.
use holocron_common::Result;
use holocron_config::{HolocronSettings, load_api_key};
use holocron_social::tumblr::{TagSearch, TumblrApi, extract_batch};
use holocron_store::{MergeStats, Store, StorePaths};
use std::time::Duration;

/// Outcome of one series within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesReport {
    pub series: String,
    pub fetched: usize,
    pub merge: MergeStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub series: Vec<SeriesReport>,
    pub posts: usize,
    pub comments: usize,
}

/// Drives a [`TagSearch`] source over a fixed series list.
pub struct Harvester<S> {
    source: S,
    series: Vec<String>,
    limit: u32,
}

impl<S> Harvester<S>
where
    S: TagSearch + Send + Sync,
{
    pub fn new(source: S, series: Vec<String>, limit: u32) -> Self {
        Self {
            source,
            series,
            limit,
        }
    }

    /// Fetch the first page of each series in order and merge it into `store`.
    pub async fn harvest(&self, store: &mut Store) -> Result<Vec<SeriesReport>> {
        let mut reports = Vec::with_capacity(self.series.len());
        for series in &self.series {
            println!("Fetching posts for {series}...");
            tracing::info!(series = %series, limit = self.limit, "harvest.series.start");

            // Only the first page: no `before` cursor is ever supplied.
            let posts = self.source.tagged(series, self.limit, None).await?;
            let batch = extract_batch(&posts, series);
            let merge = store.merge(batch);

            tracing::info!(
                series = %series,
                fetched = posts.len(),
                inserted = merge.inserted,
                replaced = merge.replaced,
                comments = merge.comments_appended,
                "harvest.series.done"
            );
            reports.push(SeriesReport {
                series: series.clone(),
                fetched: posts.len(),
                merge,
            });
        }
        Ok(reports)
    }
}

/// Run the whole pipeline described by `settings`.
pub async fn run(settings: &HolocronSettings) -> Result<RunSummary> {
    let api_key = load_api_key(&settings.credentials_path)?;

    let mut api =
        TumblrApi::with_base_url(&settings.endpoint, api_key)?.with_retries(settings.http.retries);
    if let Some(secs) = settings.http.timeout_secs {
        api = api.with_timeout(Duration::from_secs(secs));
    }

    let paths = StorePaths::new(&settings.posts_file, &settings.comments_file);
    let mut store = Store::load(&paths)?;

    let harvester = Harvester::new(api, settings.series.clone(), settings.limit);
    let reports = harvester.harvest(&mut store).await?;

    store.persist(&paths)?;

    let summary = RunSummary {
        series: reports,
        posts: store.posts.len(),
        comments: store.comments.len(),
    };
    tracing::info!(
        series = summary.series.len(),
        posts = summary.posts,
        comments = summary.comments,
        "harvest.run.done"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use holocron_common::{CommentRecord, HolocronError, PostRecord};
    use holocron_http::HttpError;
    use holocron_social::tumblr::TaggedPost;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned pages per tag; unknown tags fail like a transport error.
    #[derive(Default)]
    struct StubSearch {
        pages: HashMap<String, serde_json::Value>,
        calls: Mutex<Vec<(String, u32, Option<i64>)>>,
    }

    impl StubSearch {
        fn with_page(mut self, tag: &str, posts: serde_json::Value) -> Self {
            self.pages.insert(tag.to_string(), posts);
            self
        }
    }

    #[async_trait]
    impl TagSearch for StubSearch {
        async fn tagged(
            &self,
            tag: &str,
            limit: u32,
            before: Option<i64>,
        ) -> std::result::Result<Vec<TaggedPost>, HttpError> {
            self.calls
                .lock()
                .unwrap()
                .push((tag.to_string(), limit, before));
            let page = self
                .pages
                .get(tag)
                .ok_or_else(|| HttpError::Network(format!("no page for {tag}")))?;
            Ok(serde_json::from_value(page.clone()).unwrap())
        }
    }

    #[tokio::test]
    async fn fresh_store_gets_tagged_posts() {
        let stub = StubSearch::default().with_page("Andor", json!([{ "id": "a" }, { "id": "b" }]));
        let harvester = Harvester::new(stub, vec!["Andor".into()], 30);
        let mut store = Store::default();

        let reports = harvester.harvest(&mut store).await.unwrap();

        assert_eq!(store.posts.len(), 2);
        assert!(store.posts.iter().all(|p| p.series == "Andor"));
        assert_eq!(reports[0].fetched, 2);
        assert_eq!(reports[0].merge.inserted, 2);
    }

    #[tokio::test]
    async fn series_are_fetched_in_order_without_cursor() {
        let stub = StubSearch::default()
            .with_page("Andor", json!([]))
            .with_page("Ahsoka", json!([]));
        let harvester = Harvester::new(stub, vec!["Andor".into(), "Ahsoka".into()], 12);
        harvester.harvest(&mut Store::default()).await.unwrap();

        let calls = harvester.source.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("Andor".to_string(), 12, None), ("Ahsoka".to_string(), 12, None)]
        );
    }

    #[tokio::test]
    async fn later_series_retags_shared_post() {
        let stub = StubSearch::default()
            .with_page("Andor", json!([{ "id": "x", "reblogged_from": { "share_count": 5 } }]))
            .with_page(
                "Ahsoka",
                json!([{ "id": "x", "reblogged_from": { "share_count": 10 } }]),
            );
        let harvester = Harvester::new(stub, vec!["Andor".into(), "Ahsoka".into()], 30);
        let mut store = Store::default();
        harvester.harvest(&mut store).await.unwrap();

        assert_eq!(store.posts.len(), 1);
        assert_eq!(store.posts[0].series, "Ahsoka");
        assert_eq!(store.posts[0].shares, 10);
    }

    #[tokio::test]
    async fn comments_accumulate_across_repeated_harvests() {
        let page = json!([{ "id": "a", "notes": [{ "type": "reply", "reply_text": "hi" }] }]);
        let harvester = Harvester::new(
            StubSearch::default().with_page("Andor", page),
            vec!["Andor".into()],
            30,
        );
        let mut store = Store {
            posts: vec![PostRecord::new("old", "Ahsoka")],
            comments: vec![CommentRecord::new("old", "first")],
        };
        for _ in 0..3 {
            harvester.harvest(&mut store).await.unwrap();
        }
        assert_eq!(store.posts.len(), 2);
        assert_eq!(store.comments.len(), 1 + 3);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_remaining_series() {
        let stub = StubSearch::default().with_page("Ahsoka", json!([{ "id": "z" }]));
        let harvester = Harvester::new(stub, vec!["Andor".into(), "Ahsoka".into()], 30);
        let err = harvester.harvest(&mut Store::default()).await.unwrap_err();
        assert!(matches!(err, HolocronError::Network(_)));
        assert_eq!(harvester.source.calls.lock().unwrap().len(), 1);
    }
}
