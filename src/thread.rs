//! Thread publishing: post chunks as a reply chain.
//!
//! The first post becomes the thread root. Every later post replies to the
//! post before it, within that root. Posts are created strictly in order and
//! the first failure stops the thread; already-published posts stay up.

use tracing::debug;

use crate::error::PublishError;
use crate::links::locate_links;
use crate::social::{PostRef, ReplyContext, SocialClient};

/// Publish `chunks` as one thread and return the reference of each post.
pub async fn publish_thread<C>(client: &C, chunks: &[String]) -> Result<Vec<PostRef>, PublishError>
where
    C: SocialClient + ?Sized,
{
    let mut root: Option<PostRef> = None;
    let mut parent: Option<PostRef> = None;
    let mut published = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.iter().enumerate() {
        let links = locate_links(chunk);

        let reply = match (&root, &parent) {
            (Some(root), Some(parent)) => Some(ReplyContext {
                root: root.clone(),
                parent: parent.clone(),
            }),
            _ => None,
        };

        debug!(
            client = client.name(),
            index,
            links = links.len(),
            reply_to = reply.as_ref().map(|r| r.parent.uri.as_str()),
            "Sending post"
        );

        let post = client.create_post(chunk, &links, reply.as_ref()).await?;

        if root.is_none() {
            root = Some(post.clone());
        }
        parent = Some(post.clone());
        published.push(post);
    }

    Ok(published)
}
