//! Health and readiness flags and the endpoints that report them.
//!
//! A `HealthState` is created once and shared by `Arc` between the HTTP server
//! and whatever code reports on the process. Each flag is either "OK" or
//! failing with a message. The message `"OK"` is reserved, as is the empty
//! message; reporting either as a failure is a caller bug and panics.

use http;
use std::sync::{Arc, Mutex, MutexGuard};
use tiny_http::Method;

/// Body returned by a passing endpoint.
pub const OK: &str = "OK";

const NOT_READY: &str = "not ready";

/// The two flags. `None` means OK.
#[derive(Debug)]
pub struct HealthState {
    health: Mutex<Option<String>>,
    readiness: Mutex<Option<String>>,
}

fn lock(flag: &Mutex<Option<String>>) -> MutexGuard<Option<String>> {
    // The guarded data is a plain value, so a poisoned lock is still usable.
    match flag.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn check_failure(message: &str) {
    assert!(!message.is_empty() && message != OK, "OK status not permitted");
}

fn status(flag: &Mutex<Option<String>>) -> Result<(), String> {
    match *lock(flag) {
        None => Ok(()),
        Some(ref msg) => Err(msg.clone()),
    }
}

impl Default for HealthState {
    fn default() -> HealthState {
        HealthState {
            health: Mutex::new(None),
            readiness: Mutex::new(Some(NOT_READY.to_string())),
        }
    }
}

impl HealthState {
    /// Healthy but not ready.
    pub fn new() -> HealthState {
        HealthState::default()
    }

    /// Mark the process healthy.
    pub fn set_healthy(&self) {
        *lock(&self.health) = None;
    }

    /// Mark the process unhealthy.
    ///
    /// # Panics
    ///
    /// If `message` is empty or `"OK"`.
    pub fn set_not_healthy<S>(&self, message: S)
    where
        S: Into<String>,
    {
        let message = message.into();
        check_failure(&message);
        warn!("not healthy: {}", message);
        *lock(&self.health) = Some(message);
    }

    /// Mark the process ready to take traffic.
    pub fn set_ready(&self) {
        *lock(&self.readiness) = None;
    }

    /// Mark the process not ready.
    ///
    /// # Panics
    ///
    /// If `message` is empty or `"OK"`.
    pub fn set_not_ready<S>(&self, message: S)
    where
        S: Into<String>,
    {
        let message = message.into();
        check_failure(&message);
        info!("not ready: {}", message);
        *lock(&self.readiness) = Some(message);
    }

    /// `Ok` if healthy, otherwise the failure message.
    pub fn health(&self) -> Result<(), String> {
        status(&self.health)
    }

    /// `Ok` if ready, otherwise the failure message.
    pub fn readiness(&self) -> Result<(), String> {
        status(&self.readiness)
    }
}

fn report(status: Result<(), String>) -> (u16, String) {
    match status {
        Ok(()) => (200, OK.to_string()),
        Err(msg) => (503, msg),
    }
}

/// Answer a request for `url`. Returns the status code and body.
pub fn route(state: &HealthState, method: &Method, url: &str) -> (u16, String) {
    let path = url.split('?').next().unwrap_or("");
    let status = match path {
        "/healthz" => state.health(),
        "/readiness" => state.readiness(),
        _ => return (404, "not found".to_string()),
    };
    if *method != Method::Get {
        return (405, "method not allowed".to_string());
    }
    report(status)
}

/// Serves `/healthz` and `/readiness` from a shared `HealthState`.
pub struct HealthHandler {
    state: Arc<HealthState>,
}

impl HealthHandler {
    /// Create a handler over `state`.
    pub fn new(state: Arc<HealthState>) -> HealthHandler {
        HealthHandler { state: state }
    }
}

impl http::Handler for HealthHandler {
    fn handle(&self, request: http::Request) {
        let (code, body) = route(&self.state, request.method(), request.url());
        trace!("{} {} -> {}", request.method(), request.url(), code);
        let response = http::Response::from_string(body).with_status_code(code);
        if let Err(e) = request.respond(response) {
            warn!("failed to answer health request: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};
    use std::thread;

    #[test]
    fn starts_healthy_not_ready() {
        let state = HealthState::new();
        assert_eq!(state.health(), Ok(()));
        assert_eq!(state.readiness(), Err("not ready".to_string()));
    }

    #[test]
    fn healthz_follows_state() {
        let state = HealthState::new();
        state.set_not_healthy("db down");
        assert_eq!(
            route(&state, &Method::Get, "/healthz"),
            (503, "db down".to_string())
        );
        state.set_healthy();
        assert_eq!(
            route(&state, &Method::Get, "/healthz"),
            (200, "OK".to_string())
        );
    }

    #[test]
    fn readiness_follows_state() {
        let state = HealthState::new();
        assert_eq!(
            route(&state, &Method::Get, "/readiness?verbose=1"),
            (503, "not ready".to_string())
        );
        state.set_ready();
        assert_eq!(
            route(&state, &Method::Get, "/readiness"),
            (200, "OK".to_string())
        );
        state.set_not_ready("draining");
        assert_eq!(
            route(&state, &Method::Get, "/readiness"),
            (503, "draining".to_string())
        );
    }

    #[test]
    fn flags_are_independent() {
        let state = HealthState::new();
        state.set_not_healthy("disk full");
        assert_eq!(state.readiness(), Err("not ready".to_string()));
        state.set_ready();
        assert_eq!(state.health(), Err("disk full".to_string()));
    }

    #[test]
    fn other_routes() {
        let state = HealthState::new();
        assert_eq!(route(&state, &Method::Post, "/healthz").0, 405);
        assert_eq!(route(&state, &Method::Get, "/metrics").0, 404);
        assert_eq!(route(&state, &Method::Delete, "/").0, 404);
    }

    #[test]
    #[should_panic(expected = "OK status not permitted")]
    fn not_healthy_rejects_ok() {
        HealthState::new().set_not_healthy("OK");
    }

    #[test]
    #[should_panic(expected = "OK status not permitted")]
    fn not_healthy_rejects_empty() {
        HealthState::new().set_not_healthy("");
    }

    #[test]
    #[should_panic(expected = "OK status not permitted")]
    fn not_ready_rejects_ok() {
        HealthState::new().set_not_ready("OK");
    }

    #[test]
    #[should_panic(expected = "OK status not permitted")]
    fn not_ready_rejects_empty() {
        HealthState::new().set_not_ready(String::new());
    }

    #[test]
    fn concurrent_readers_see_whole_messages() {
        fn inner(msgs: Vec<String>) -> TestResult {
            let msgs: Vec<String> = msgs.into_iter()
                .filter(|m| !m.is_empty() && m != "OK")
                .collect();
            if msgs.is_empty() {
                return TestResult::discard();
            }
            let state = Arc::new(HealthState::new());
            let writer = {
                let state = Arc::clone(&state);
                let msgs = msgs.clone();
                thread::spawn(move || for m in msgs {
                    state.set_not_healthy(m);
                    state.set_healthy();
                })
            };
            for _ in 0..100 {
                if let Err(m) = state.health() {
                    if !msgs.contains(&m) {
                        return TestResult::failed();
                    }
                }
            }
            writer.join().unwrap();
            TestResult::from_bool(state.health().is_ok())
        }
        QuickCheck::new()
            .tests(100)
            .max_tests(1000)
            .quickcheck(inner as fn(Vec<String>) -> TestResult);
    }
}
