//! State shared between the scheduler, the capability closures and guest
//! threads.
//!
//! Framebuffer, output buffer and input snapshot all sit behind one mutex.
//! The scheduler takes it for clear, drain and present; every capability
//! that touches console state takes it for the duration of the call, so
//! draws from guest threads serialise with the frame loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::framebuffer::Framebuffer;
use crate::input::InputState;

#[derive(Debug, Default)]
pub struct FrameState {
    pub framebuffer: Framebuffer,
    pub input: InputState,
    pub output: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ConsoleContext {
    state: Mutex<FrameState>,
    quit: AtomicBool,
    threads: ThreadRegistry,
    random_seed: Option<u64>,
}

impl ConsoleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn random_seed(&self) -> Option<u64> {
        self.random_seed
    }

    pub fn lock(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock()
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Start a tick: blank the framebuffer and install this tick's input.
    pub fn begin_frame(&self, input: InputState) {
        let mut state = self.lock();
        state.framebuffer.clear(0);
        state.input = input;
    }

    pub fn push_output(&self, line: String) {
        self.lock().output.push(line);
    }

    pub fn drain_output(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().output)
    }

    pub fn framebuffer(&self) -> Framebuffer {
        self.lock().framebuffer.clone()
    }

    pub fn threads(&self) -> &ThreadRegistry {
        &self.threads
    }
}

/// Counts guest threads that are still running.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    running: Mutex<usize>,
    finished: Condvar,
}

impl ThreadRegistry {
    pub fn started(&self) {
        *self.running.lock() += 1;
    }

    pub fn finished(&self) {
        let mut running = self.running.lock();
        *running = running.saturating_sub(1);
        if *running == 0 {
            self.finished.notify_all();
        }
    }

    pub fn running(&self) -> usize {
        *self.running.lock()
    }

    /// Block until every thread has finished or `timeout` passes.
    /// Returns the number still running.
    pub fn wait_idle(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock();
        while *running > 0 {
            if self.finished.wait_until(&mut running, deadline).timed_out() {
                break;
            }
        }
        *running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn begin_frame_clears_and_sets_input() {
        let ctx = ConsoleContext::new();
        ctx.lock().framebuffer.set(1, 1, 5);
        let input = InputState {
            up: true,
            ..Default::default()
        };
        ctx.begin_frame(input);
        assert_eq!(ctx.framebuffer().get(1, 1), Some(0));
        assert_eq!(ctx.lock().input, input);
    }

    #[test]
    fn output_drains_once() {
        let ctx = ConsoleContext::new();
        ctx.push_output("a".into());
        ctx.push_output("b".into());
        assert_eq!(ctx.drain_output(), vec!["a", "b"]);
        assert!(ctx.drain_output().is_empty());
    }

    #[test]
    fn quit_flag_is_per_context() {
        let a = ConsoleContext::new();
        let b = ConsoleContext::new();
        a.request_quit();
        assert!(a.quit_requested());
        assert!(!b.quit_requested());
    }

    #[test]
    fn wait_idle_returns_when_threads_finish() {
        let ctx = Arc::new(ConsoleContext::new());
        ctx.threads().started();
        let worker = Arc::clone(&ctx);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            worker.threads().finished();
        });
        assert_eq!(ctx.threads().wait_idle(Duration::from_secs(5)), 0);
        handle.join().unwrap();
    }

    #[test]
    fn wait_idle_times_out() {
        let ctx = ConsoleContext::new();
        ctx.threads().started();
        assert_eq!(ctx.threads().wait_idle(Duration::from_millis(10)), 1);
    }
}
