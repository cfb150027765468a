//! Invocation handler: one inbound event in, at most one thread out.
//!
//! Flow:
//! 1. Decode the envelope into an email (failure → `Undecodable`)
//! 2. Check the sender against the allow-list
//! 3. Extract the alert text (policy rejections end here)
//! 4. Reflow into post-sized chunks
//! 5. Log in and publish the chunks as a thread

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::alert::{AlertExtractor, Rejection};
use crate::config::RelayConfig;
use crate::envelope::{Email, decode_event};
use crate::error::Result;
use crate::reflow::reflow;
use crate::social::{PostRef, SocialClient};
use crate::thread::publish_thread;

/// What an invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event was not an SES notification we could read.
    Undecodable,
    /// The sender is not on the allow-list.
    UnapprovedSender { sender: String },
    /// The email was not publishable.
    Rejected(Rejection),
    /// The thread was published; one reference per post, root first.
    Published(Vec<PostRef>),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Undecodable => "undecodable",
            Self::UnapprovedSender { .. } => "unapproved_sender",
            Self::Rejected(rejection) => rejection.label(),
            Self::Published(_) => "published",
        }
    }
}

/// Relays transit alert emails to a social thread.
pub struct AlertRelay {
    config: RelayConfig,
    extractor: AlertExtractor,
}

impl AlertRelay {
    pub fn new(config: RelayConfig, extractor: AlertExtractor) -> Self {
        Self { config, extractor }
    }

    /// Build a relay with the default alert patterns from the environment.
    pub fn from_env() -> Result<Self> {
        let config = RelayConfig::from_env()?;
        Ok(Self::new(config, AlertExtractor::default()))
    }

    /// Build a relay with the default alert patterns from a key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = RelayConfig::from_lookup(lookup)?;
        Ok(Self::new(config, AlertExtractor::default()))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Handle one inbound event.
    ///
    /// Shape problems and policy rejections are `Ok` outcomes; only a
    /// publishing failure is an error.
    pub async fn handle_event<C>(&self, event: &Value, client: &mut C) -> Result<Outcome>
    where
        C: SocialClient + ?Sized,
    {
        debug!(event = %event, "Got event");

        let email = match decode_event(event) {
            Ok(email) => email,
            Err(e) => {
                warn!(error = %e, "Couldn't decode event as an SES notification");
                return Ok(Outcome::Undecodable);
            }
        };

        self.handle_email(&email, client).await
    }

    /// Handle an already-decoded email.
    pub async fn handle_email<C>(&self, email: &Email, client: &mut C) -> Result<Outcome>
    where
        C: SocialClient + ?Sized,
    {
        info!(
            sender = %email.sender,
            subject = %email.subject,
            "Email received"
        );

        if !self.config.is_sender_approved(&email.sender) {
            warn!(sender = %email.sender, "Got email from unapproved sender");
            return Ok(Outcome::UnapprovedSender {
                sender: email.sender.clone(),
            });
        }

        let text = match self.extractor.extract(email) {
            Ok(text) => text,
            Err(rejection @ Rejection::NotAlertShape) => {
                debug!(sender = %email.sender, "Does not match the alert template");
                return Ok(Outcome::Rejected(rejection));
            }
            Err(rejection @ Rejection::ContainsAddress) => {
                warn!(sender = %email.sender, "Not posting; alert contains an email address");
                return Ok(Outcome::Rejected(rejection));
            }
        };

        let chunks = reflow(&text, self.config.max_post_length);
        debug!(chunks = chunks.len(), "Reflowed alert into posts");

        client
            .login(&self.config.username, &self.config.password)
            .await?;

        let posts = publish_thread(&*client, &chunks).await?;
        info!(
            posts = posts.len(),
            root = posts.first().map(|p| p.uri.as_str()),
            "Published alert thread"
        );

        Ok(Outcome::Published(posts))
    }
}
