//! Canned-response [`HttpClient`] for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Request, Response};

use super::client::HttpClient;

#[derive(Clone)]
enum Reply {
    Respond { status: u16, body: Vec<u8> },
    Hang,
}

#[derive(Clone)]
struct Route {
    pattern: String,
    reply: Reply,
}

/// Answers each request with the first route whose pattern is a substring
/// of the request URL, or `404` if none matches. Clones share the request
/// log.
#[derive(Clone, Default)]
pub(crate) struct StubClient {
    routes: Vec<Route>,
    log: Arc<Mutex<Vec<(String, HeaderMap)>>>,
}

impl StubClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(mut self, pattern: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            reply: Reply::Respond {
                status,
                body: body.into(),
            },
        });
        self
    }

    /// Requests matching `pattern` never complete.
    pub(crate) fn hang(mut self, pattern: &str) -> Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            reply: Reply::Hang,
        });
        self
    }

    pub(crate) fn requested_urls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub(crate) fn requested_headers(&self, name: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(_, headers)| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .collect()
    }
}

fn response(status: u16, body: Vec<u8>) -> Response {
    http::Response::builder()
        .status(status)
        .body(body)
        .unwrap()
        .into()
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        let url = req.url().to_string();
        self.log
            .lock()
            .unwrap()
            .push((url.clone(), req.headers().clone()));

        let reply = self
            .routes
            .iter()
            .find(|r| url.contains(&r.pattern))
            .map(|r| r.reply.clone());

        match reply {
            Some(Reply::Respond { status, body }) => Ok(response(status, body)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(response(404, Vec::new())),
        }
    }
}
