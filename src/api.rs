//! Typed client for the REST backend the dashboards talk to.
//!
//! Auth is passed in explicitly (`with_token`) instead of being read from some
//! global store, so a client value fully describes who is calling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::blog::{sort_newest_first, BlogPost};
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::fetch::http::{get_json, ping_health, read_json, HealthWarmUp};
use crate::fetch::{FetchController, ItemSource, WarmUp};
use crate::predictions::{ShortTermRequest, ShortTermResult};

const USER_AGENT: &str = concat!("smartstox-client/", env!("CARGO_PKG_VERSION"));

/// Bearer token for admin/user calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken(len={})", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    cfg: Arc<ClientConfig>,
    token: Option<AuthToken>,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(FetchError::from)?;
        Ok(Self {
            http,
            cfg: Arc::new(cfg.clone()),
            token: None,
        })
    }

    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn url(&self, path: &str) -> String {
        self.cfg.url(path)
    }

    /// Controller preconfigured with the retry policy and, when enabled, the health warm-up.
    pub fn controller(&self) -> FetchController {
        let controller = FetchController::new(self.cfg.retry);
        if self.cfg.warm_up {
            controller.with_warm_up(self.warm_up())
        } else {
            controller
        }
    }

    pub fn warm_up(&self) -> Arc<dyn WarmUp> {
        Arc::new(HealthWarmUp::new(self.http.clone(), self.cfg.health_url()))
    }

    /// `true` when the health endpoint answers 2xx.
    pub async fn health(&self) -> bool {
        ping_health(&self.http, &self.cfg.health_url())
            .await
            .is_some_and(|status| (200..300).contains(&status))
    }

    pub async fn list_posts(&self) -> Result<Vec<BlogPost>, FetchError> {
        let mut posts: Vec<BlogPost> = get_json(&self.http, &self.url("/api/posts")).await?;
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    pub async fn post_by_slug(&self, slug: &str) -> Result<BlogPost, FetchError> {
        get_json(&self.http, &self.url(&format!("/api/posts/{slug}"))).await
    }

    pub async fn related_posts(&self, slug: &str) -> Result<Vec<BlogPost>, FetchError> {
        get_json(&self.http, &self.url(&format!("/api/posts/related/{slug}"))).await
    }

    pub async fn short_term_predict(
        &self,
        req: &ShortTermRequest,
    ) -> Result<Vec<ShortTermResult>, FetchError> {
        let resp = self
            .http
            .post(self.url("/api/short-term-predict"))
            .json(req)
            .send()
            .await
            .map_err(FetchError::from)?;
        read_json(resp).await
    }

    /// Current user for the injected token; `None` when no token was given.
    pub async fn me(&self) -> Result<Option<User>, FetchError> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let resp = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(FetchError::from)?;
        read_json(resp).await.map(Some)
    }

    pub fn posts_source(&self) -> PostsSource {
        PostsSource { api: self.clone() }
    }

    pub fn post_detail_source(&self, slug: impl Into<String>) -> PostDetailSource {
        PostDetailSource {
            api: self.clone(),
            slug: slug.into(),
        }
    }

    pub fn related_source(&self, slug: impl Into<String>) -> RelatedPostsSource {
        RelatedPostsSource {
            api: self.clone(),
            slug: slug.into(),
        }
    }
}

/// Blog list, newest first.
pub struct PostsSource {
    api: ApiClient,
}

#[async_trait]
impl ItemSource for PostsSource {
    type Item = BlogPost;

    async fn fetch(&self) -> Result<Vec<BlogPost>, FetchError> {
        self.api.list_posts().await
    }

    fn name(&self) -> &'static str {
        "posts"
    }
}

/// Single post. A 404 is reported as an empty list so freshly published posts
/// get the empty-retry budget instead of failing outright.
pub struct PostDetailSource {
    api: ApiClient,
    slug: String,
}

#[async_trait]
impl ItemSource for PostDetailSource {
    type Item = BlogPost;

    async fn fetch(&self) -> Result<Vec<BlogPost>, FetchError> {
        match self.api.post_by_slug(&self.slug).await {
            Ok(post) => Ok(vec![post]),
            Err(e) if e.status_code() == Some(404) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "post_detail"
    }
}

pub struct RelatedPostsSource {
    api: ApiClient,
    slug: String,
}

#[async_trait]
impl ItemSource for RelatedPostsSource {
    type Item = BlogPost;

    async fn fetch(&self) -> Result<Vec<BlogPost>, FetchError> {
        self.api.related_posts(&self.slug).await
    }

    fn name(&self) -> &'static str {
        "related_posts"
    }
}
