// Shared helpers: a stub Funix Cloud server on an ephemeral port and a
// session wired to an in-memory renderer and scripted prompts.
#![allow(dead_code)]

use funix_cloud::config::Config;
use funix_cloud::render::Renderer;
use funix_cloud::ui::ScriptedPrompt;
use funix_cloud::Session;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

/// One request as the stub server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct StubServer {
    pub url: String,
    handle: JoinHandle<Vec<Recorded>>,
}

impl StubServer {
    /// Answers one request per reply, in order, then stops.
    pub fn start(replies: Vec<Value>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let mut req = match server.recv_timeout(Duration::from_secs(10)) {
                    Ok(Some(req)) => req,
                    _ => break,
                };
                let header = |name: &'static str| {
                    req.headers()
                        .iter()
                        .find(|h| h.field.equiv(name))
                        .map(|h| h.value.as_str().to_string())
                };
                let authorization = header("Authorization");
                let content_type = header("Content-Type");
                let mut body = Vec::new();
                req.as_reader().read_to_end(&mut body).unwrap();
                seen.push(Recorded {
                    method: req.method().to_string(),
                    url: req.url().to_string(),
                    authorization,
                    content_type,
                    body,
                });
                let json =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                req.respond(Response::from_string(reply.to_string()).with_header(json))
                    .unwrap();
            }
            seen
        });
        StubServer {
            url: format!("http://127.0.0.1:{port}"),
            handle,
        }
    }

    /// Requests received so far; waits for the server thread to end.
    pub fn finish(self) -> Vec<Recorded> {
        self.handle.join().unwrap()
    }
}

pub fn session(
    config_path: &Path,
    server: &str,
    token: Option<&str>,
    answers: &[&str],
) -> Session<Vec<u8>> {
    let mut config = Config::load(config_path).unwrap();
    if let Some(token) = token {
        config.set_token(Some(token.to_string())).unwrap();
    }
    let prompt = ScriptedPrompt::new(answers.iter().copied());
    Session::new(config, server, Renderer::new(Vec::new()), Box::new(prompt)).unwrap()
}

pub fn output(s: &Session<Vec<u8>>) -> String {
    String::from_utf8_lossy(s.out.get_ref()).into_owned()
}

pub fn stored_token(config_path: &Path) -> Option<String> {
    Config::load(config_path).unwrap().token
}
