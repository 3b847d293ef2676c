//! In-memory backend whose calls block until the test opens their gate.
//!
//! Records the order calls started in and the peak number running at once.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, SystemTime};

use dlq_core::backend::{Backend, Outcome};

/// A call that is never released gives up after this long.
const GATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct State {
    running: usize,
    max_running: usize,
    started: Vec<String>,
    open: HashSet<String>,
    open_all: bool,
    fail: HashSet<String>,
    panic: HashSet<String>,
}

#[derive(Default)]
pub struct GatedBackend {
    state: Mutex<State>,
    cond: Condvar,
}

impl GatedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose calls complete immediately.
    pub fn open() -> Arc<Self> {
        let b = Self::new();
        b.release_all();
        b
    }

    pub fn fail_on(&self, url: &str) {
        self.state.lock().unwrap().fail.insert(url.to_string());
    }

    pub fn panic_on(&self, url: &str) {
        self.state.lock().unwrap().panic.insert(url.to_string());
    }

    pub fn release(&self, url: &str) {
        self.state.lock().unwrap().open.insert(url.to_string());
        self.cond.notify_all();
    }

    pub fn release_all(&self) {
        self.state.lock().unwrap().open_all = true;
        self.cond.notify_all();
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn running(&self) -> usize {
        self.state.lock().unwrap().running
    }

    pub fn max_running(&self) -> usize {
        self.state.lock().unwrap().max_running
    }

    /// Waits until at least `n` calls have started (5s cap).
    pub async fn wait_started(&self, n: usize) {
        for _ in 0..500 {
            if self.started().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} started calls, saw {:?}", n, self.started());
    }
}

impl Backend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    fn fetch(&self, url: &str) -> Outcome {
        let mut st = self.state.lock().unwrap();
        st.running += 1;
        st.max_running = st.max_running.max(st.running);
        st.started.push(url.to_string());
        let (mut st, timeout) = self
            .cond
            .wait_timeout_while(st, GATE_TIMEOUT, |s| !s.open_all && !s.open.contains(url))
            .unwrap();
        st.running -= 1;
        if timeout.timed_out() {
            return Outcome::failure("gate never opened");
        }
        if st.panic.contains(url) {
            drop(st);
            panic!("simulated panic for {}", url);
        }
        if st.fail.contains(url) {
            return Outcome::failure(format!("simulated failure for {}", url));
        }
        let name = url.rsplit('/').next().unwrap_or("artifact");
        Outcome::Success {
            path: PathBuf::from("/downloads").join(name),
            completed_at: SystemTime::now(),
        }
    }
}
