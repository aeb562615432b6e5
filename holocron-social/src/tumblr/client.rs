//! Minimal wrapper around the Tumblr tagged-search API.
//!
//! Handles key placement (`api_key` query param) and request parameter shaping
//! before delegating to the shared HTTP client. Callers get one page per call;
//! `before` is the cursor for older pages, but nothing in the harvest loop walks it.
use crate::tumblr::types::{TaggedPost, TaggedResponse};
use async_trait::async_trait;
use holocron_http::{HttpClient, HttpError, QueryAuth, RequestOpts};
use std::borrow::Cow;
use std::time::Duration;

const TAGGED_PATH: &str = "v2/tagged";

/// Source of tagged posts, one page per call.
#[async_trait]
pub trait TagSearch {
    async fn tagged(
        &self,
        tag: &str,
        limit: u32,
        before: Option<i64>,
    ) -> Result<Vec<TaggedPost>, HttpError>;
}

#[derive(Clone)]
pub struct TumblrApi {
    http: HttpClient,
    api_key: String,
}

impl TumblrApi {
    pub fn with_base_url(base: &str, api_key: String) -> Result<Self, HttpError> {
        Ok(Self {
            http: HttpClient::new(base)?,
            api_key,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.http = self.http.with_timeout(dur);
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.http = self.http.with_retries(n);
        self
    }
}

#[async_trait]
impl TagSearch for TumblrApi {
    async fn tagged(
        &self,
        tag: &str,
        limit: u32,
        before: Option<i64>,
    ) -> Result<Vec<TaggedPost>, HttpError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("tag", tag.into()),
            ("limit", limit.to_string().into()),
            ("filter", "raw".into()),
        ];
        if let Some(before) = before {
            params.push(("before", before.to_string().into()));
        }

        let resp: TaggedResponse = self
            .http
            .get_json(
                TAGGED_PATH,
                RequestOpts {
                    auth: Some(QueryAuth::new("api_key", self.api_key.as_str())),
                    query: Some(params),
                },
            )
            .await?;

        tracing::debug!(
            tag,
            limit,
            ?before,
            meta_status=?resp.meta.as_ref().and_then(|m| m.status),
            meta_msg=?resp.meta.as_ref().and_then(|m| m.msg.as_deref()),
            posts=resp.response.len(),
            "tumblr.tagged.page"
        );
        Ok(resp.response)
    }
}
