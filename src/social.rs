//! Social network client: posts to Bluesky over the AT Protocol XRPC API.
//!
//! `SocialClient` is the seam the thread publisher drives; `BlueskyClient`
//! is the real implementation and tests substitute a recording mock.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::PublishError;
use crate::links::LinkSpan;

const POST_COLLECTION: &str = "app.bsky.feed.post";
const LINK_FACET_TYPE: &str = "app.bsky.richtext.facet#link";

/// Strong reference to a created post (`com.atproto.repo.strongRef`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}

/// Where a reply sits in its thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub root: PostRef,
    pub parent: PostRef,
}

/// Outbound posting collaborator.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Open a session for `identifier`.
    async fn login(
        &mut self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<(), PublishError>;

    /// Create a post with link facets, optionally as a reply.
    async fn create_post(
        &self,
        text: &str,
        links: &[LinkSpan],
        reply: Option<&ReplyContext>,
    ) -> Result<PostRef, PublishError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    did: String,
    access_jwt: String,
}

/// Bluesky client authenticated with an app password.
pub struct BlueskyClient {
    service: String,
    client: reqwest::Client,
    session: Option<Session>,
}

impl BlueskyClient {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            session: None,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/xrpc/{method}", self.service)
    }

    /// Whether `login` has succeeded.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }
}

#[async_trait]
impl SocialClient for BlueskyClient {
    fn name(&self) -> &str {
        "bluesky"
    }

    async fn login(
        &mut self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<(), PublishError> {
        let body = serde_json::json!({
            "identifier": identifier,
            "password": password.expose_secret(),
        });

        let resp = self
            .client
            .post(self.api_url("com.atproto.server.createSession"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(PublishError::AuthFailed {
                identifier: identifier.to_string(),
                reason: format!("{status}: {err}"),
            });
        }

        let session: Session =
            resp.json()
                .await
                .map_err(|e| PublishError::InvalidResponse {
                    endpoint: "com.atproto.server.createSession".into(),
                    reason: e.to_string(),
                })?;

        tracing::info!(did = %session.did, "Logged in to {}", self.service);
        self.session = Some(session);
        Ok(())
    }

    async fn create_post(
        &self,
        text: &str,
        links: &[LinkSpan],
        reply: Option<&ReplyContext>,
    ) -> Result<PostRef, PublishError> {
        let session = self.session.as_ref().ok_or(PublishError::NotLoggedIn)?;
        let endpoint = "com.atproto.repo.createRecord";

        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = serde_json::json!({
            "repo": session.did,
            "collection": POST_COLLECTION,
            "record": build_post_record(text, links, reply, &created_at),
        });

        let resp = self
            .client
            .post(self.api_url(endpoint))
            .bearer_auth(&session.access_jwt)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let err = resp.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                endpoint: endpoint.into(),
                status,
                body: err,
            });
        }

        resp.json::<PostRef>()
            .await
            .map_err(|e| PublishError::InvalidResponse {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })
    }
}

/// Build an `app.bsky.feed.post` record.
pub fn build_post_record(
    text: &str,
    links: &[LinkSpan],
    reply: Option<&ReplyContext>,
    created_at: &str,
) -> serde_json::Value {
    let mut record = serde_json::json!({
        "$type": POST_COLLECTION,
        "text": text,
        "createdAt": created_at,
    });

    if !links.is_empty() {
        let facets: Vec<serde_json::Value> = links
            .iter()
            .map(|link| {
                serde_json::json!({
                    "index": {
                        "byteStart": link.byte_start,
                        "byteEnd": link.byte_end,
                    },
                    "features": [{
                        "$type": LINK_FACET_TYPE,
                        "uri": link.url,
                    }],
                })
            })
            .collect();
        record["facets"] = serde_json::Value::Array(facets);
    }

    if let Some(reply) = reply {
        record["reply"] = serde_json::json!({
            "root": reply.root,
            "parent": reply.parent,
        });
    }

    record
}
