//! Tiny, unassuming HTTP Server

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time;
use tiny_http;

/// A received request.
pub type Request = tiny_http::Request;
/// A response with an in-memory body.
pub type Response = tiny_http::Response<io::Cursor<Vec<u8>>>;

/// How long the server waits for a request before checking for shutdown.
const POLL_INTERVAL_MS: u64 = 100;

/// Simple single threaded HTTP request handler.
pub trait Handler: Sync + Send {
    /// Answer `request`. The handler is responsible for responding.
    fn handle(&self, request: Request);
}

/// Single threaded HTTP server.
pub struct Server {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    /// Thread handle for the operating HTTP server.
    thread: thread::JoinHandle<()>,
}

fn http_server<H>(stop: &AtomicBool, tiny_http_server: &tiny_http::Server, handler: &H)
where
    H: Handler,
{
    let interval = time::Duration::from_millis(POLL_INTERVAL_MS);
    while !stop.load(Ordering::Acquire) {
        match tiny_http_server.recv_timeout(interval) {
            Ok(Some(request)) => handler.handle(request),
            Ok(None) => continue,
            Err(e) => {
                error!("failed during recv_timeout: {}", e);
                break;
            }
        }
    }
}

/// Single threaded HTTP server implementation.
impl Server {
    /// Bind `host_port` and start serving requests with `handler`.
    ///
    /// Binding happens before this returns so a bad address is reported to
    /// the caller. Port 0 binds an ephemeral port; see `local_addr`.
    pub fn new<H>(host_port: &str, handler: H) -> io::Result<Server>
    where
        H: Handler + 'static,
    {
        let tiny_http_server = tiny_http::Server::http(host_port)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let addr = tiny_http_server
            .server_addr()
            .to_ip()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "not bound to an IP address"))?;
        info!("http server listening on {}", addr);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("http".to_string())
            .spawn(move || http_server(&thread_stop, &tiny_http_server, &handler))?;
        Ok(Server {
            addr: addr,
            stop: stop,
            thread: thread,
        })
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the server thread exits.
    pub fn join(self) {
        if self.thread.join().is_err() {
            error!("http server thread panicked");
        }
    }

    /// Stop accepting requests and wait for the server thread to exit.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Release);
        self.join();
        info!("http server stopped");
    }
}
