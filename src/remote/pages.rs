//! Lazy page stream over a paginated remote listing
//!
//! Produces pages until the store stops returning a cursor. The stream is
//! finite and not restartable; a failed page request ends it.

use futures::stream::{self, Stream};
use tracing::debug;

use super::errors::RemoteError;
use super::retry::RetryPolicy;
use super::types::{RemoteLister, RemotePage};

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Stream every page under `prefix`, following continuation cursors
///
/// An empty page that still carries a cursor does not end the stream.
pub fn pages<'a, L>(
    lister: &'a L,
    bucket: &'a str,
    prefix: &'a str,
    policy: RetryPolicy,
) -> impl Stream<Item = Result<RemotePage, RemoteError>> + 'a
where
    L: RemoteLister + ?Sized,
{
    stream::unfold(Cursor::Start, move |cursor| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return None,
        };

        debug!(bucket = bucket, prefix = prefix, cursor = ?token, "Requesting listing page");
        let result = policy
            .run("list_page", || lister.list_page(bucket, prefix, token.as_deref()))
            .await;

        match result {
            Ok(page) => {
                let next = match &page.next_cursor {
                    Some(token) => Cursor::Next(token.clone()),
                    None => Cursor::Done,
                };
                Some((Ok(page), next))
            }
            Err(e) => Some((Err(e), Cursor::Done)),
        }
    })
}
