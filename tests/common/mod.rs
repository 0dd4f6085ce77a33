//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use switchyard::config::ServerConfig;
use switchyard::http::{
    handler_fn, DispatchOptions, Dispatcher, Handler, HttpServer, Request, Response,
};
use switchyard::middleware::{Failure, Middleware};
use switchyard::routing::RouterNode;
use switchyard::{ConverterRegistry, Shutdown};

/// Ordered record of middleware and handler calls.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Middleware that logs `<name>.Req`, `<name>.Exc` and `<name>.Resp`.
pub struct Recorder {
    name: &'static str,
    log: CallLog,
    short_circuit: bool,
    claim: bool,
    panic_on_response: bool,
}

impl Recorder {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            log: log.clone(),
            short_circuit: false,
            claim: false,
            panic_on_response: false,
        }
    }

    /// Answer from the request phase.
    pub fn short_circuit(mut self) -> Self {
        self.short_circuit = true;
        self
    }

    /// Claim any exception offered.
    pub fn claiming(mut self) -> Self {
        self.claim = true;
        self
    }

    pub fn panicking_on_response(mut self) -> Self {
        self.panic_on_response = true;
        self
    }
}

impl Middleware for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process_request(&self, _req: &mut Request) -> Option<Response> {
        self.log.push(format!("{}.Req", self.name));
        self.short_circuit
            .then(|| Response::text(format!("short-circuited by {}", self.name)))
    }

    fn process_exception(&self, _req: &Request, failure: &Failure) -> Option<Response> {
        self.log.push(format!("{}.Exc", self.name));
        self.claim.then(|| {
            Response::text(format!("{} handled: {}", self.name, failure.message()))
                .with_status(axum::http::StatusCode::SERVICE_UNAVAILABLE)
        })
    }

    fn process_response(&self, _req: &Request, _response: &mut Response) {
        self.log.push(format!("{}.Resp", self.name));
        if self.panic_on_response {
            panic!("{} failed in response phase", self.name);
        }
    }
}

/// Handler that logs `handler` and returns `body`.
pub fn recording_handler(log: &CallLog, body: &'static str) -> Arc<dyn Handler> {
    let log = log.clone();
    handler_fn(move |_req: Request| {
        log.push("handler");
        async move { body }
    })
}

/// Handler that logs `handler` and then panics.
pub fn panicking_handler(log: &CallLog) -> Arc<dyn Handler> {
    let log = log.clone();
    handler_fn(move |_req: Request| {
        log.push("handler");
        async {
            if true {
                panic!("handler failure");
            }
            "unreachable"
        }
    })
}

pub fn root() -> RouterNode {
    RouterNode::root(Arc::new(ConverterRegistry::with_builtins()))
}

pub fn get(uri: &str) -> Request {
    request(axum::http::Method::GET, uri)
}

pub fn request(method: axum::http::Method, uri: &str) -> Request {
    Request::new(method, uri.parse().expect("test uri"))
}

/// A live server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub async fn start(config: ServerConfig, router: RouterNode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dispatcher = Dispatcher::new(
            router,
            DispatchOptions {
                expose_errors: config.debug.expose_errors,
            },
        );
        let shutdown = Shutdown::new();
        let server = HttpServer::new(config, dispatcher);
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server task.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}
