// Shared test doubles for the dispatch integration tests.

#![allow(dead_code)]

use bulkdns_lib::{BulkDnsError, Resolve, Resolving};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct State {
    delay: Duration,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: Mutex<Vec<(String, Instant)>>,
    completed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Resolver that answers `192.0.2.1` for every name after an optional delay.
///
/// Names registered with `failing` resolve to an error, names registered
/// with `panicking` make `resolve` panic. Clones share their bookkeeping.
#[derive(Clone, Default)]
pub struct MockResolver {
    state: Arc<State>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self::builder(delay, &[], &[])
    }

    pub fn failing(names: &[&str]) -> Self {
        Self::builder(Duration::ZERO, names, &[])
    }

    pub fn panicking(names: &[&str]) -> Self {
        Self::builder(Duration::ZERO, &[], names)
    }

    pub fn builder(delay: Duration, failing: &[&str], panicking: &[&str]) -> Self {
        Self {
            state: Arc::new(State {
                delay,
                failing: failing.iter().map(|s| s.to_string()).collect(),
                panicking: panicking.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    /// Names in the order their lookups started, with the start instant.
    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        self.state.completed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    pub fn address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))
    }
}

impl Resolve for MockResolver {
    fn resolve(&self, name: &str) -> Resolving {
        if self.state.panicking.contains(name) {
            panic!("mock resolver exploded on {}", name);
        }

        self.state
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), Instant::now()));

        let state = self.state.clone();
        let name = name.to_string();
        Box::pin(async move {
            let active = state.active.fetch_add(1, Ordering::SeqCst) + 1;
            state.max_active.fetch_max(active, Ordering::SeqCst);

            if !state.delay.is_zero() {
                tokio::time::sleep(state.delay).await;
            }

            state.active.fetch_sub(1, Ordering::SeqCst);
            state.completed.fetch_add(1, Ordering::SeqCst);

            if state.failing.contains(&name) {
                Err(BulkDnsError::resolution(&name, "no such host"))
            } else {
                Ok(vec![MockResolver::address()])
            }
        })
    }
}

/// Newline-joined input with a trailing newline per name.
pub fn input_of(names: &[&str]) -> Vec<u8> {
    let mut input = Vec::new();
    for name in names {
        input.extend_from_slice(name.as_bytes());
        input.push(b'\n');
    }
    input
}

/// `count` distinct names: `host-0.example`, `host-1.example`, ...
pub fn numbered_input(count: usize) -> Vec<u8> {
    let mut input = Vec::new();
    for i in 0..count {
        input.extend_from_slice(format!("host-{}.example\n", i).as_bytes());
    }
    input
}
