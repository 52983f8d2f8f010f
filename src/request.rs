//! Incoming HTTP request type.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body_util::BodyExt;
use hyper::body::Body;

use crate::error::{BoxError, Error};

/// An incoming HTTP request with its body fully buffered.
///
/// The chain never inspects the request itself; it is passed through to
/// every [`Endpoint`](crate::Endpoint) untouched unless a middleware decides
/// otherwise.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self { inner }
    }

    /// Buffers the body of a host request.
    pub(crate) async fn from_body<B>(req: http::Request<B>) -> Result<Self, Error>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::Body(e.into()))?
            .to_bytes();
        Ok(Self::new(http::Request::from_parts(parts, body)))
    }

    pub fn method(&self) -> &Method { self.inner.method() }
    pub fn uri(&self) -> &Uri { self.inner.uri() }
    pub fn path(&self) -> &str { self.inner.uri().path() }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &[u8] { self.inner.body() }

    /// Header lookup. Returns `None` for missing or non-ASCII values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Credentials from an `Authorization: Basic …` header.
    ///
    /// The scheme is matched case-insensitively. Returns `None` if the header
    /// is missing, not base64, not UTF-8, or has no `:` separator.
    pub fn basic_auth(&self) -> Option<(String, String)> {
        const SCHEME: &str = "basic ";

        let value = self.header("authorization")?;
        if value.len() < SCHEME.len() || !value[..SCHEME.len()].eq_ignore_ascii_case(SCHEME) {
            return None;
        }
        let decoded = STANDARD.decode(&value[SCHEME.len()..]).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some((user.to_owned(), pass.to_owned()))
    }

    pub fn into_inner(self) -> http::Request<Bytes> {
        self.inner
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(inner: http::Request<Bytes>) -> Self {
        Self::new(inner)
    }
}
