//! Request-loop detection for chained pull-through fetches.
//!
//! Every hop appends its own URL to the `X-Registry-Request-URL` header of the
//! request it sends on. A hop whose URL is already in the trace it received
//! is refused with [`Error::LoopDetected`].

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Request, Url};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Trace header, one value per hop. Sent as `X-Registry-Request-URL`;
/// header names are case-insensitive.
pub const REQUEST_URL_HEADER: HeaderName = HeaderName::from_static("x-registry-request-url");

/// URLs visited so far, oldest first.
///
/// Header values are carried as received; values that are not visible ASCII
/// are propagated to the next hop but never match a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTrace {
    values: Vec<HeaderValue>,
}

impl RequestTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the trace carried by `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let values = headers.get_all(&REQUEST_URL_HEADER).iter().cloned().collect();
        Self { values }
    }

    /// The values that read as text, in order.
    pub fn urls(&self) -> Vec<&str> {
        self.values.iter().filter_map(|v| v.to_str().ok()).collect()
    }

    /// Number of hops, including values that do not read as text.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.values.iter().any(|v| v.as_bytes() == url.as_bytes())
    }

    /// A new trace with `url` appended.
    pub fn with(&self, url: &str) -> Result<Self> {
        let value = HeaderValue::from_str(url)
            .map_err(|e| Error::BadRequest(format!("{REQUEST_URL_HEADER} value {url:?}: {e}")))?;
        let mut values = self.values.clone();
        values.push(value);
        Ok(Self { values })
    }

    /// Replace the trace header in `headers` with this trace.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        headers.remove(&REQUEST_URL_HEADER);
        for value in &self.values {
            headers.append(REQUEST_URL_HEADER, value.clone());
        }
    }
}

/// Stateless request modifier built from the trace of the parent request.
#[derive(Debug, Clone, Default)]
pub struct RequestTracer {
    parent: RequestTrace,
}

impl RequestTracer {
    /// Tracer for requests issued while serving `parent`; `None` on the
    /// first hop.
    pub fn new(parent: Option<&Request>) -> Self {
        let parent = parent
            .map(|r| RequestTrace::from_headers(r.headers()))
            .unwrap_or_default();
        Self { parent }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            parent: RequestTrace::from_headers(headers),
        }
    }

    /// Trace to send with a request to `url`.
    pub fn trace_for(&self, url: &Url) -> Result<RequestTrace> {
        let url = url.as_str();
        if self.parent.contains(url) {
            warn!(%url, hops = self.parent.len(), "request loop detected");
            return Err(Error::LoopDetected {
                url: url.to_string(),
            });
        }
        self.parent.with(url)
    }

    /// Stamp `request` with the parent trace plus its own URL. On a loop the
    /// request is left untouched and must not be sent.
    pub fn modify_request(&self, request: &mut Request) -> Result<RequestTrace> {
        let trace = self.trace_for(request.url())?;
        trace.write_to(request.headers_mut());
        debug!(url = %request.url(), hops = trace.len(), "traced request");
        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn request(url: &str) -> Request {
        Request::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn first_hop_has_only_own_url() {
        let mut req = request("https://a.example/v2/");
        let trace = RequestTracer::new(None).modify_request(&mut req).unwrap();
        assert_eq!(trace.urls(), ["https://a.example/v2/"]);
        assert_eq!(RequestTrace::from_headers(req.headers()), trace);
    }

    #[test]
    fn existing_header_on_outgoing_request_is_replaced() {
        let mut req = request("https://b.example/");
        req.headers_mut()
            .insert(REQUEST_URL_HEADER, HeaderValue::from_static("stale"));
        RequestTracer::new(None).modify_request(&mut req).unwrap();
        assert_eq!(
            RequestTrace::from_headers(req.headers()).urls(),
            ["https://b.example/"]
        );
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.append(
            HeaderName::from_bytes(b"X-Registry-Request-URL").unwrap(),
            HeaderValue::from_static("https://c.example/"),
        );
        let tracer = RequestTracer::from_headers(&headers);
        let err = tracer
            .trace_for(&Url::parse("https://c.example/").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::LoopDetected { .. }), "{err}");
    }

    #[test]
    fn opaque_parent_values_are_propagated() {
        let mut headers = HeaderMap::new();
        headers.append(REQUEST_URL_HEADER, HeaderValue::from_static("https://a.example/"));
        headers.append(
            REQUEST_URL_HEADER,
            HeaderValue::from_bytes(b"https://b.example/\xe9").unwrap(),
        );

        let mut req = request("https://c.example/");
        let trace = RequestTracer::from_headers(&headers)
            .modify_request(&mut req)
            .unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.urls(), ["https://a.example/", "https://c.example/"]);

        let sent: Vec<&[u8]> = req
            .headers()
            .get_all(&REQUEST_URL_HEADER)
            .iter()
            .map(HeaderValue::as_bytes)
            .collect();
        assert_eq!(
            sent,
            [
                b"https://a.example/".as_slice(),
                b"https://b.example/\xe9".as_slice(),
                b"https://c.example/".as_slice(),
            ]
        );
    }
}
