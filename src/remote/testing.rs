//! Scripted in-memory remote store for tests

use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use super::errors::RemoteError;
use super::types::{ObjectReader, RemoteDownloader, RemoteLister, RemotePage};

enum Object {
    Body(Vec<u8>),
    FetchError(RemoteError),
    /// Yields the prefix, then fails mid-stream
    BrokenStream(Vec<u8>),
    /// Yields the prefix, then never produces more data
    Stalled(Vec<u8>),
}

/// Remote store answering from scripted pages and objects
#[derive(Default)]
pub struct FakeRemote {
    pages: Mutex<VecDeque<Result<RemotePage, RemoteError>>>,
    objects: HashMap<String, Object>,
    cursors: Mutex<Vec<Option<String>>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a listing page
    pub fn page(self, page: RemotePage) -> Self {
        self.pages.lock().unwrap().push_back(Ok(page));
        self
    }

    /// Queue a failing listing request
    pub fn page_error(self, error: RemoteError) -> Self {
        self.pages.lock().unwrap().push_back(Err(error));
        self
    }

    /// Serve `body` for `key`
    pub fn object(mut self, key: &str, body: &str) -> Self {
        self.objects
            .insert(key.to_string(), Object::Body(body.as_bytes().to_vec()));
        self
    }

    /// Fail the fetch of `key`
    pub fn failing_object(mut self, key: &str, error: RemoteError) -> Self {
        self.objects
            .insert(key.to_string(), Object::FetchError(error));
        self
    }

    /// Serve part of `key` and then break the stream
    pub fn broken_object(mut self, key: &str, prefix: &str) -> Self {
        self.objects.insert(
            key.to_string(),
            Object::BrokenStream(prefix.as_bytes().to_vec()),
        );
        self
    }

    /// Serve part of `key` and then stop sending without closing the stream
    pub fn stalled_object(mut self, key: &str, prefix: &str) -> Self {
        self.objects
            .insert(key.to_string(), Object::Stalled(prefix.as_bytes().to_vec()));
        self
    }

    /// Cursors passed to each `list_page` call
    pub fn cursors_seen(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }

    /// Number of `list_page` calls
    pub fn page_requests(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }

    /// Keys passed to `fetch`, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteLister for FakeRemote {
    async fn list_page(
        &self,
        _bucket: &str,
        _prefix: &str,
        cursor: Option<&str>,
    ) -> Result<RemotePage, RemoteError> {
        self.cursors.lock().unwrap().push(cursor.map(str::to_owned));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Request("no scripted page left".into())))
    }
}

#[async_trait]
impl RemoteDownloader for FakeRemote {
    async fn fetch(&self, _bucket: &str, key: &str) -> Result<ObjectReader, RemoteError> {
        self.fetched.lock().unwrap().push(key.to_string());
        match self.objects.get(key) {
            Some(Object::Body(body)) => Ok(Box::pin(io::Cursor::new(body.clone()))),
            Some(Object::FetchError(e)) => Err(e.clone()),
            Some(Object::BrokenStream(prefix)) => Ok(Box::pin(BrokenReader {
                prefix: Some(prefix.clone()),
            })),
            Some(Object::Stalled(prefix)) => Ok(Box::pin(StalledReader {
                prefix: Some(prefix.clone()),
            })),
            None => Err(RemoteError::NotFound(key.to_string())),
        }
    }
}

struct BrokenReader {
    prefix: Option<Vec<u8>>,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.prefix.take() {
            Some(prefix) => {
                buf.put_slice(&prefix);
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }
}

struct StalledReader {
    prefix: Option<Vec<u8>>,
}

impl AsyncRead for StalledReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.prefix.take() {
            Some(prefix) => {
                buf.put_slice(&prefix);
                Poll::Ready(Ok(()))
            }
            None => Poll::Pending,
        }
    }
}
