// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Shared helpers for integration tests

#![allow(dead_code)]

use serde_json::Value;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tiny_http::{Response, Server};

/// A valid manifest
pub const VALID_MANIFEST: &str = include_str!("../fixtures/code.json");

/// Parsed copy of [`VALID_MANIFEST`]
pub fn valid_manifest() -> Value {
    serde_json::from_str(VALID_MANIFEST).unwrap()
}

/// A request the mock API received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub api_version: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

struct Route {
    method: &'static str,
    path: String,
    status: u16,
    body: String,
}

/// Canned REST API; unmatched requests get a 404
#[derive(Default)]
pub struct MockApiBuilder {
    routes: Vec<Route>,
}

impl MockApiBuilder {
    pub fn route(mut self, method: &'static str, path: &str, status: u16, body: Value) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn start(self) -> MockApi {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let header = |name: &'static str| {
                        request
                            .headers()
                            .iter()
                            .find(|h| h.field.equiv(name))
                            .map(|h| h.value.as_str().to_string())
                    };
                    let recorded = Recorded {
                        method: request.method().as_str().to_string(),
                        url: request.url().to_string(),
                        authorization: header("Authorization"),
                        api_version: header("X-GitHub-Api-Version"),
                        body,
                    };
                    let path = recorded.url.split('?').next().unwrap_or_default().to_string();
                    let route = self
                        .routes
                        .iter()
                        .find(|r| r.method == recorded.method && r.path == path);
                    requests.lock().unwrap().push(recorded);

                    let response = match route {
                        Some(route) => Response::from_string(route.body.clone())
                            .with_status_code(route.status),
                        None => Response::from_string(r#"{"message":"Not Found"}"#)
                            .with_status_code(404),
                    };
                    let _ = request.respond(response);
                }
            })
        };

        MockApi {
            url: format!("http://{addr}"),
            requests,
            server,
            handle: Some(handle),
        }
    }
}

/// Running mock API, stopped on drop
pub struct MockApi {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl MockApi {
    pub fn builder() -> MockApiBuilder {
        MockApiBuilder::default()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
