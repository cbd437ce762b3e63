//! In-memory transport for tests: canned responses matched by URL substring

use std::sync::Mutex;

use super::{HttpRequest, HttpResponse, Transport};

enum Reply {
    Status(u16, String),
    Failure(String),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    rules: Mutex<Vec<(String, Reply)>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer any URL containing `pattern` with `status` and `body`.
    /// Earlier rules win.
    pub(crate) fn respond(&self, pattern: &str, status: u16, body: &str) {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), Reply::Status(status, body.to_string())));
    }

    /// Fail any URL containing `pattern` at the transport level
    pub(crate) fn fail(&self, pattern: &str, message: &str) {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), Reply::Failure(message.to_string())));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn count_matching(&self, pattern: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(pattern))
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.sent.lock().unwrap().push(request.clone());

        let rules = self.rules.lock().unwrap();
        match rules.iter().find(|(pattern, _)| request.url.contains(pattern)) {
            Some((_, Reply::Status(status, body))) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Some((_, Reply::Failure(message))) => Err(message.clone()),
            None => Ok(HttpResponse {
                status: 404,
                body: "no scripted response".to_string(),
            }),
        }
    }
}
