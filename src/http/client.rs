//! Feed API client
//!
//! Issues single-shot requests against the feed API. Retrying is the
//! paging engine's job; this layer only classifies failures, feeds response
//! headers back into the session and governor, and paces the next request.

use super::rate_limit::RateGovernor;
use crate::config::ClientConfig;
use crate::engine::{PagingEngine, PagingOutcome};
use crate::error::{DispatchStage, Error, Result};
use crate::expand::ReferenceExpander;
use crate::pagination::{field, PagingOptions};
use crate::resource::{self, Resource};
use crate::session::{Credentials, Session, SessionBridge};
use crate::sink::ResultSink;
use crate::types::{encode_component, JsonValue, Method, Profile, Record};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, COOKIE, ORIGIN};
use reqwest::{Client, Response};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const REFERRER: HeaderName = HeaderName::from_static("referrer");
const LANGUAGE: &str = "en-us";

/// Post state the web client uses for a published post
const POST_STATE_PUBLISHED: u8 = 4;

/// Client for the feed API.
///
/// Cheap to clone; clones share the connection pool, the session and the
/// rate governor.
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    config: ClientConfig,
    api_url: Url,
    session: Session,
    governor: RateGovernor,
    bridge: SessionBridge,
    expander: ReferenceExpander,
    options: PagingOptions,
}

impl FeedClient {
    /// Create a client. The config is validated here, before any request.
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        let api_url = Url::parse(&config.api_url())?;
        let options = config.paging_options()?;
        let governor = RateGovernor::new(config.governor_config());
        let session = Session::new(credentials);
        let bridge = SessionBridge::new(session.clone(), governor.clone());
        let expander = ReferenceExpander::new(config.expand_fields.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                api_url,
                session,
                governor,
                bridge,
                expander,
                options,
            }),
        })
    }

    /// Config in use
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Session holding the current tokens
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Governor pacing every request of this client
    pub fn governor(&self) -> &RateGovernor {
        &self.inner.governor
    }

    /// Paging options derived from the config
    pub fn paging_options(&self) -> &PagingOptions {
        &self.inner.options
    }

    // ========================================================================
    // Request construction
    // ========================================================================

    /// `Referrer` header value for a request about `profile`.
    ///
    /// The base is the resource's page, else the profile's override, else
    /// the web origin; the most specific subject is appended.
    pub fn referrer(&self, profile: &Profile, resource: Option<&Resource>) -> String {
        let origin = self.inner.config.origin();
        let mut referrer = match resource.and_then(|r| r.referrer_path) {
            Some(path) => format!("{origin}{path}"),
            None => profile.referrer.clone().unwrap_or(origin),
        };

        if let Some(username) = &profile.username {
            referrer.push_str(&format!("/profile/{}/posts", encode_component(username)));
        } else if let Some(id) = &profile.id {
            referrer.push_str(&format!("/post-view?q={}", encode_component(id)));
        } else if let Some(tag) = &profile.tag {
            referrer.push_str(&format!("/?hashtag={}", encode_component(tag)));
        }

        referrer
    }

    /// Headers sent with every request
    pub fn headers(&self, profile: &Profile, resource: Option<&Resource>) -> Result<HeaderMap> {
        let config = &self.inner.config;
        let cookie = self.inner.session.credentials().cookie_header();

        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, header_value(&config.origin())?);
        headers.insert(COOKIE, header_value(&cookie)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGE));
        headers.insert(REFERRER, header_value(&self.referrer(profile, resource))?);
        Ok(headers)
    }

    /// URL of one page: resource parameters, then `limit`, then `startkey`
    pub fn page_url(
        &self,
        resource: &Resource,
        profile: &Profile,
        cursor: Option<&str>,
    ) -> Result<Url> {
        let mut url = self.inner.api_url.join(resource.path)?;
        let mut params = resource.query_params(profile);

        if let Some(limit) = resource.effective_page_size(self.inner.config.page_size) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = cursor {
            params.push(("startkey", cursor.to_string()));
        }

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    // ========================================================================
    // Paged requests
    // ========================================================================

    /// Fetch one page of `resource`.
    ///
    /// Non-2xx statuses and unreadable bodies are transport errors, which
    /// the paging engine retries.
    pub async fn fetch_page(
        &self,
        resource: &Resource,
        profile: Profile,
        cursor: Option<String>,
    ) -> Result<JsonValue> {
        let url = self.page_url(resource, &profile, cursor.as_deref())?;
        let headers = self.headers(&profile, Some(resource))?;

        debug!("Fetching {url}");
        let response = self.inner.http.get(url).headers(headers).send().await?;
        let response = self.settle(response).await?;

        // Minimize impact on the service
        self.inner.governor.wait(false, false).await;

        read_json(response).await
    }

    /// Export every page of `resource` into `sink` using the configured
    /// paging options
    pub async fn export<S>(
        &self,
        resource: &'static Resource,
        profile: &Profile,
        sink: &mut S,
    ) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export_with(resource, profile, self.inner.options.clone(), sink)
            .await
    }

    /// Export with explicit paging options for this invocation only
    pub async fn export_with<S>(
        &self,
        resource: &'static Resource,
        profile: &Profile,
        options: PagingOptions,
        sink: &mut S,
    ) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        info!("Exporting {} from {}", resource.name, resource.path);

        let client = self;
        let fetch = move |profile: Profile, cursor: Option<String>| async move {
            client.fetch_page(resource, profile, cursor).await
        };

        let mut engine = PagingEngine::new(fetch)
            .with_reduce(field(resource.result_field))
            .with_options(options)
            .with_governor(self.inner.governor.clone());

        if !resource.expansion.is_empty() && !self.inner.expander.config().is_empty() {
            engine = engine.with_expansion(self.inner.expander.clone(), resource.expansion);
        }

        engine.run(profile, sink).await
    }

    /// Home feed
    pub async fn feed<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::FEED, profile, sink).await
    }

    /// Posts written by the profile's user id
    pub async fn posts<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::POSTS, profile, sink).await
    }

    /// Users the profile follows
    pub async fn following<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::FOLLOWING, profile, sink).await
    }

    /// Users following the profile
    pub async fn followers<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::FOLLOWERS, profile, sink).await
    }

    /// Comments written by the profile's username
    pub async fn user_comments<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::USER_COMMENTS, profile, sink).await
    }

    /// Comments on a post
    pub async fn post_comments<S>(&self, post_id: &str, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::POST_COMMENTS, &Profile::with_id(post_id), sink)
            .await
    }

    /// Replies to a comment; the profile's username shapes the referrer
    pub async fn comment_replies<S>(
        &self,
        profile: &Profile,
        comment_id: &str,
        sink: &mut S,
    ) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        let subject = Profile {
            id: Some(comment_id.to_string()),
            username: profile.username.clone(),
            ..Profile::default()
        };
        self.export(&resource::COMMENT_REPLIES, &subject, sink).await
    }

    /// Posts carrying a hashtag
    pub async fn tag<S>(&self, tag: &str, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::TAG, &Profile::with_tag(tag), sink).await
    }

    /// Posts the profile voted for
    pub async fn votes<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::VOTES, profile, sink).await
    }

    /// Affiliate news links
    pub async fn affiliate_news<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::AFFILIATE_NEWS, profile, sink).await
    }

    /// Comments pending moderation
    pub async fn moderation<S>(&self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
    {
        self.export(&resource::MODERATION, profile, sink).await
    }

    // ========================================================================
    // Single requests
    // ========================================================================

    /// A user's profile, or the logged-in user's when `username` is None
    pub async fn profile(
        &self,
        username: Option<&str>,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<JsonValue> {
        let subject = username.map(Profile::with_username).unwrap_or_default();
        let query: Vec<_> = username.map(|u| ("username", u)).into_iter().collect();

        let json = self
            .request(Method::GET, "v1/profile", &query, &subject, None)
            .await?;
        deliver(vec![json.clone()], sink)?;
        Ok(json)
    }

    /// A single post with its references expanded
    pub async fn post(&self, id: &str, sink: Option<&mut dyn ResultSink>) -> Result<JsonValue> {
        let mut json = self
            .request(Method::GET, "v1/post", &[("id", id)], &Profile::with_id(id), None)
            .await?;

        if let Some(obj) = json.as_object_mut() {
            let post = obj.remove("post").unwrap_or(JsonValue::Null);
            obj.insert("posts".to_string(), JsonValue::Array(vec![post]));
        }
        let json = self.inner.expander.expand_all(json)?;

        let posts = json
            .get("posts")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();
        deliver(posts, sink)?;
        Ok(json)
    }

    /// Publish a post
    pub async fn write_post(
        &self,
        profile: &Profile,
        text: &str,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<JsonValue> {
        let body = json!({
            "body": text,
            "parent": null,
            "links": [],
            "state": POST_STATE_PUBLISHED,
        });
        self.deliver_one(Method::POST, "v1/post", &[], profile, Some(body), sink)
            .await
    }

    /// Delete a post
    pub async fn delete_post(
        &self,
        profile: &Profile,
        id: &str,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<JsonValue> {
        let body = json!({ "id": id });
        self.deliver_one(Method::POST, "v1/post/delete", &[], profile, Some(body), sink)
            .await
    }

    /// Follow a user
    pub async fn follow(&self, username: &str, sink: Option<&mut dyn ResultSink>) -> Result<JsonValue> {
        self.user_action("v1/follow", username, sink).await
    }

    /// Stop following a user
    pub async fn unfollow(
        &self,
        username: &str,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<JsonValue> {
        self.user_action("v1/follow/delete", username, sink).await
    }

    /// Mute a user
    pub async fn mute(&self, username: &str, sink: Option<&mut dyn ResultSink>) -> Result<JsonValue> {
        self.user_action("v1/user/mute", username, sink).await
    }

    async fn user_action(
        &self,
        path: &str,
        username: &str,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<JsonValue> {
        let referrer = Profile::new().referrer(format!("{}/feed", self.inner.config.origin()));
        let body = json!({ "username": username });
        self.deliver_one(
            Method::POST,
            path,
            &[("username", username)],
            &referrer,
            Some(body),
            sink,
        )
        .await
    }

    async fn deliver_one(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        profile: &Profile,
        body: Option<JsonValue>,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<JsonValue> {
        let json = self.request(method, path, query, profile, body).await?;
        deliver(vec![json.clone()], sink)?;
        Ok(json)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        profile: &Profile,
        body: Option<JsonValue>,
    ) -> Result<JsonValue> {
        let mut url = self.inner.api_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let headers = self.headers(profile, None)?;

        self.inner.governor.wait(false, false).await;

        debug!("Fetching {url}");
        let mut request = self.inner.http.request(method.into(), url).headers(headers);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = self.settle(request.send().await?).await?;
        read_json(response).await
    }

    /// Feed response headers back, then reject non-2xx statuses
    async fn settle(&self, response: Response) -> Result<Response> {
        if self.inner.bridge.observe(response.headers()) {
            debug!("Session tokens updated from response");
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::http_status(status.as_u16(), body))
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("api_url", &self.inner.api_url.as_str())
            .field("session", &self.inner.session)
            .field("governor", &self.inner.governor)
            .finish_non_exhaustive()
    }
}

/// Single-request delivery: start, one batch that is both first and last, finish
fn deliver(records: Vec<Record>, sink: Option<&mut dyn ResultSink>) -> Result<()> {
    let Some(sink) = sink else {
        return Ok(());
    };

    if !sink.start() {
        return Err(Error::dispatch(DispatchStage::Start));
    }
    if !sink.emit(records, true, true) {
        return Err(Error::dispatch(DispatchStage::Emit));
    }
    if !sink.finish() {
        return Err(Error::dispatch(DispatchStage::Finish));
    }
    Ok(())
}

async fn read_json(response: Response) -> Result<JsonValue> {
    response
        .json()
        .await
        .map_err(|e| Error::transport(format!("Malformed response body: {e}")))
}

// The value may carry session tokens; keep it out of the error
fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::config(format!("Invalid header value: {e}")))
}
