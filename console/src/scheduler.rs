//! The fixed-tick frame loop.
//!
//! `Init → Loading → Running → Shutdown`. Guest errors are contained per
//! call: they are logged, counted and never stop the loop. Only host
//! failures (display, I/O) come back as `Err`.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use vm::{CapabilityTable, Environment, Value, VM};

use crate::capabilities;
use crate::config::ConsoleConfig;
use crate::constants::{OUTPUT_PREFIX, RECENT_GUEST_ERRORS};
use crate::context::ConsoleContext;
use crate::display::Display;
use crate::error::{GuestError, HostError, Location};
use crate::input::InputSource;
use crate::loader::{load_cartridge, EntryPoints, SandboxLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Init,
    Loading,
    Running,
    Shutdown,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Init => "init",
            SchedulerState::Loading => "loading",
            SchedulerState::Running => "running",
            SchedulerState::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Guest output drained this tick.
    pub output: Vec<String>,
    /// Whether `update` failed.
    pub update_failed: bool,
    pub presented: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub guest_errors: usize,
    /// Guest threads still running when the join timeout expired.
    pub detached_threads: usize,
}

pub struct Scheduler<D: Display, I: InputSource> {
    config: ConsoleConfig,
    ctx: Arc<ConsoleContext>,
    table: Arc<CapabilityTable>,
    loader: SandboxLoader,
    vm: VM,
    display: D,
    input: I,
    state: SchedulerState,
    entries: EntryPoints,
    ticks: u64,
    guest_error_count: usize,
    /// The last [`RECENT_GUEST_ERRORS`] errors, oldest first.
    recent_errors: VecDeque<GuestError>,
    detached_threads: usize,
}

impl<D: Display, I: InputSource> Scheduler<D, I> {
    pub fn new(config: ConsoleConfig, display: D, input: I) -> Self {
        let ctx = Arc::new(ConsoleContext::new().with_random_seed(config.random_seed));
        let table = capabilities::build(&ctx);
        let loader = SandboxLoader::new(&table);
        let vm = VM::new(Environment::new(Arc::clone(&table))).with_budget(config.instruction_budget);
        let caption = display.caption();
        debug!(capabilities = table.len(), caption, "console initialised");
        Self {
            config,
            ctx,
            table,
            loader,
            vm,
            display,
            input,
            state: SchedulerState::Init,
            entries: EntryPoints::default(),
            ticks: 0,
            guest_error_count: 0,
            recent_errors: VecDeque::with_capacity(RECENT_GUEST_ERRORS),
            detached_threads: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn context(&self) -> &Arc<ConsoleContext> {
        &self.ctx
    }

    pub fn capabilities(&self) -> &Arc<CapabilityTable> {
        &self.table
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Most recent guest errors, oldest first. Older ones are only counted.
    pub fn guest_errors(&self) -> &VecDeque<GuestError> {
        &self.recent_errors
    }

    fn record_error(&mut self, err: GuestError) {
        self.guest_error_count += 1;
        if self.recent_errors.len() == RECENT_GUEST_ERRORS {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(err);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            guest_errors: self.guest_error_count,
            detached_threads: self.detached_threads,
        }
    }

    /// Read a cartridge from disk and load it. Only the read can fail.
    pub fn load_path(&mut self, path: &Path) -> Result<(), HostError> {
        let cart = load_cartridge(path)?;
        info!(path = %cart.path.display(), "loading cartridge");
        self.load_source(&cart.source);
        Ok(())
    }

    /// Compile, execute the top level and run `setup`. Always ends in
    /// `Running`; a cartridge that fails to compile just has no entry
    /// points.
    pub fn load_source(&mut self, source: &str) {
        if self.state != SchedulerState::Init {
            warn!(state = %self.state, "cartridge already loaded");
            return;
        }
        self.state = SchedulerState::Loading;

        match self.loader.compile(source) {
            Ok(unit) => {
                if let Err(e) = self.loader.execute(&mut self.vm, &unit) {
                    self.record_error(e);
                }
                self.entries = self.loader.entry_points(&self.vm.env);
            }
            Err(e) => {
                warn!(error = %e, "cartridge failed to compile");
                self.record_error(e);
            }
        }

        if let Some(setup) = self.entries.setup.clone() {
            if let Err(source) = self.vm.call(&setup, &[]) {
                let err = GuestError::LoadRuntime {
                    location: Location::of(&self.vm),
                    source,
                };
                warn!(error = %err, "setup failed");
                self.record_error(err);
            }
        }

        // Output printed while loading goes out with the first drain.
        self.state = SchedulerState::Running;
        info!("cartridge running");
    }

    /// Run exactly one iteration of the frame loop.
    pub fn tick(&mut self) -> Result<TickReport, HostError> {
        if self.state != SchedulerState::Running {
            return Ok(TickReport {
                tick: self.ticks,
                ..Default::default()
            });
        }
        self.ticks += 1;
        let tick = self.ticks;

        let input = self.input.snapshot();
        self.ctx.begin_frame(input);
        if self.display.poll_quit() {
            debug!(tick, "display requested quit");
            self.ctx.request_quit();
        }

        let mut update_failed = false;
        if let Some(update) = self.entries.update.clone() {
            update_failed = !self.call_update(&update, tick);
        }

        let output = self.ctx.drain_output();
        if !output.is_empty() {
            info!(target: "cart", "{} {}", OUTPUT_PREFIX, output.join("\n"));
        }

        let mut presented = false;
        if self.ctx.quit_requested() {
            info!(tick, "quit requested");
            self.shutdown();
        } else {
            let frame = self.ctx.framebuffer();
            self.display.present(&frame)?;
            presented = true;
            if matches!(self.config.max_ticks, Some(max) if tick >= max) {
                info!(tick, "tick limit reached");
                self.shutdown();
            }
        }

        Ok(TickReport {
            tick,
            output,
            update_failed,
            presented,
        })
    }

    fn call_update(&mut self, update: &Value, tick: u64) -> bool {
        match self.vm.call(update, &[]) {
            Ok(_) => true,
            Err(source) => {
                let err = GuestError::FrameRuntime {
                    entry: "update",
                    tick,
                    location: Location::of(&self.vm),
                    source,
                };
                warn!(error = %err, "update failed");
                self.record_error(err);
                false
            }
        }
    }

    /// Tick until shutdown, sleeping to hold the configured rate.
    pub fn run(&mut self) -> Result<RunSummary, HostError> {
        let frame_time = match self.config.fps {
            0 => None,
            fps => Some(Duration::from_secs_f64(1.0 / f64::from(fps))),
        };
        while self.state == SchedulerState::Running {
            let started = Instant::now();
            self.tick()?;
            if let Some(frame_time) = frame_time {
                if let Some(rest) = frame_time.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
        }
        Ok(self.summary())
    }

    /// Stop the loop from the host side.
    pub fn request_quit(&mut self) {
        if self.state != SchedulerState::Shutdown {
            self.shutdown();
        }
    }

    fn shutdown(&mut self) {
        let timeout = Duration::from_millis(self.config.thread_join_timeout_ms);
        let left = self.ctx.threads().wait_idle(timeout);
        if left > 0 {
            warn!(threads = left, ?timeout, "guest threads still running; detaching");
        }
        self.detached_threads = left;
        self.display.shutdown();
        self.state = SchedulerState::Shutdown;
        info!(ticks = self.ticks, guest_errors = self.guest_error_count, "console shut down");
    }
}
