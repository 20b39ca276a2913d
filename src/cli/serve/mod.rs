//! Preview server: HTTP API, WebSocket hub and change watcher.
//!
//! ```text
//! lectern serve talk.md
//!   ├── tiny_http + rayon pool   /api/execute, /api/deck, /api/status, /api/drivers
//!   ├── tokio runtime            Hub::run (client set, fan-out)
//!   ├── ws accept thread         one thread per connection
//!   └── watch thread             ChangeWatcher -> reload -> Hub
//! ```

mod lifecycle;
mod response;
mod routes;


use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tiny_http::{Method, Request, Server};

use crate::actor::Coordinator;
use crate::actor::ws::{Hub, HubHandle};
use crate::cli::args::ServeArgs;
use crate::config::PresentationStore;
use crate::exec::Registry;
use crate::gateway::{Gateway, MAX_BODY_BYTES};
use crate::reload::server::start_ws_server;
use crate::{debug, log};

/// Request worker threads. Executions block a worker for their full duration.
const REQUEST_THREADS: usize = 8;

/// Everything a request handler needs.
pub struct ServeContext {
    store: Arc<PresentationStore>,
    gateway: Gateway,
    hub: HubHandle,
    ws_port: u16,
}

impl ServeContext {
    pub fn new(
        store: Arc<PresentationStore>,
        registry: Option<Arc<Registry>>,
        hub: HubHandle,
        ws_port: u16,
    ) -> Self {
        let gateway = Gateway::new(registry, Arc::clone(&store));
        Self {
            store,
            gateway,
            hub,
            ws_port,
        }
    }
}

/// Run `lectern serve` until Ctrl+C.
pub fn serve_deck(args: &ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let store = PresentationStore::open(&args.deck, config_path, args.overrides())
        .with_context(|| format!("failed to open {}", args.deck.display()))?;
    let store = Arc::new(store);

    // Server settings and the driver table are fixed for the session
    let config = store.current().config.clone();
    let registry = Arc::new(Registry::from_config(&config));
    debug!("exec"; "drivers: {}", registry.names().join(", "));

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let runtime = lifecycle::hub_runtime()?;
    let (hub, hub_handle) = Hub::new();
    runtime.spawn(hub.run());

    let ws_port = start_ws_server(config.serve.interface, config.serve.ws_port, hub_handle.clone())?;
    if ws_port != config.serve.ws_port {
        log!("ws"; "port {} in use, using {} instead", config.serve.ws_port, ws_port);
    }
    debug!("ws"; "ws://{}:{}", config.serve.interface, ws_port);

    let coordinator = Coordinator::new(Arc::clone(&store), hub_handle.clone());
    if config.serve.watch {
        coordinator
            .start()
            .with_context(|| format!("failed to watch {}", store.deck_path().display()))?;
    }

    lifecycle::register_server_for_shutdown(&server);
    log!("serve"; "http://{}", addr);

    let ctx = Arc::new(ServeContext::new(
        store,
        Some(registry),
        hub_handle.clone(),
        ws_port,
    ));
    let result = run_request_loop(&server, &ctx);

    coordinator.stop();
    hub_handle.stop();
    runtime.shutdown_timeout(Duration::from_secs(2));
    debug!("serve"; "stopped");
    result
}

fn run_request_loop(server: &Server, ctx: &Arc<ServeContext>) -> Result<()> {
    // Executions block for up to their timeout; keep other requests moving
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("lectern-http-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(mut request: Request, ctx: &ServeContext) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }
    if request.method() == &Method::Options {
        return response::respond_preflight(request);
    }

    let mut body = Vec::new();
    if request.method() == &Method::Post {
        request
            .as_reader()
            .take(MAX_BODY_BYTES as u64 + 1)
            .read_to_end(&mut body)?;
    }

    let method = request.method().as_str().to_ascii_uppercase();
    let path = routes::request_path(request.url()).to_string();
    debug!("serve"; "{} {}", method, path);

    match routes::route(ctx, &method, &path, &body) {
        Some(reply) => response::respond_raw_json(request, reply.status, reply.body),
        None => response::respond_not_found(request),
    }
}
