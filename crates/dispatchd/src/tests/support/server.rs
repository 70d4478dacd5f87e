//! In-process server harness driving the launch sequence with test doubles
//! for forking and signal delivery.

use std::fs;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::application::Application;
use crate::bootstrap::ConfigLoader;
use crate::health::HealthReporter;
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_server_with};
use crate::process::{
    DaemonizeError, Daemonizer, Detached, Launch, LaunchError, LaunchMode, ShutdownError,
    ShutdownSignal,
};

use super::application::TestApplication;
use super::config_loader::TestConfigLoader;
use super::reporter::{HealthEvent, RecordingHealthReporter};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub type StepResult = Result<(), String>;

/// Daemoniser double that pretends to fork.
#[derive(Clone)]
pub struct TestDaemonizer {
    side: Detached,
    calls: Arc<AtomicUsize>,
    reporter: Arc<RecordingHealthReporter>,
    events_at_fork: Arc<Mutex<Vec<HealthEvent>>>,
}

impl TestDaemonizer {
    pub fn new(side: Detached, reporter: Arc<RecordingHealthReporter>) -> Self {
        Self {
            side,
            calls: Arc::new(AtomicUsize::new(0)),
            reporter,
            events_at_fork: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Health events recorded before the simulated fork.
    pub fn events_at_fork(&self) -> Vec<HealthEvent> {
        self.events_at_fork
            .lock()
            .expect("fork snapshot mutex poisoned")
            .clone()
    }
}

impl Daemonizer for TestDaemonizer {
    fn daemonize(&self) -> Result<Detached, DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .events_at_fork
            .lock()
            .expect("fork snapshot mutex poisoned") = self.reporter.events();
        Ok(self.side)
    }
}

/// Shutdown signal double released by [`TestShutdownSignal::trigger`].
#[derive(Clone)]
pub struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
    installs: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl TestShutdownSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
            installs: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn install(&self) -> Result<(), ShutdownError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(())
    }

    fn release(&self) -> Result<(), ShutdownError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type LaunchResult = Result<Launch, LaunchError>;

/// Runs the launch sequence on a background thread.
pub struct ServerHarness {
    pub loader: TestConfigLoader,
    pub reporter: Arc<RecordingHealthReporter>,
    pub application: TestApplication,
    pub daemonizer: TestDaemonizer,
    pub shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<LaunchResult>>,
    result: Option<LaunchResult>,
}

impl ServerHarness {
    /// Builds a harness whose simulated fork lands on `side`.
    pub fn new(side: Detached) -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        Self {
            loader: TestConfigLoader::new(),
            daemonizer: TestDaemonizer::new(side, Arc::clone(&reporter)),
            reporter,
            application: TestApplication::new(),
            shutdown: TestShutdownSignal::new(),
            handle: None,
            result: None,
        }
    }

    /// Starts the launch sequence without waiting for it to finish.
    pub fn start(&mut self, mode: LaunchMode) -> Result<(), String> {
        if self.handle.is_some() || self.result.is_some() {
            return Err("server already started".to_owned());
        }
        let plan = self.plan(mode, self.loader.clone());
        self.handle = Some(thread::spawn(move || run_server_with(plan)));
        Ok(())
    }

    /// Runs the launch sequence to completion with the given loader.
    pub fn run_with_loader<L>(&mut self, mode: LaunchMode, loader: L)
    where
        L: ConfigLoader,
    {
        let plan = self.plan(mode, loader);
        self.result = Some(run_server_with(plan));
    }

    fn plan<L>(
        &self,
        mode: LaunchMode,
        loader: L,
    ) -> LaunchPlan<L, TestDaemonizer, TestShutdownSignal> {
        let reporter: Arc<dyn HealthReporter> = self.reporter.clone();
        let application: Arc<dyn Application> = Arc::new(self.application.clone());
        LaunchPlan {
            process: ProcessControl {
                mode: Some(mode),
                daemonizer: self.daemonizer.clone(),
                shutdown: self.shutdown.clone(),
            },
            services: ServiceDeps {
                loader,
                reporter,
                application,
            },
        }
    }

    /// Waits until the listener reports its bound address.
    pub fn address(&self) -> Result<SocketAddr, String> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Some(address) = self.reporter.listener_address() {
                return Ok(address);
            }
            if self.handle.as_ref().is_some_and(thread::JoinHandle::is_finished) {
                return Err("server stopped before listening".to_owned());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err("server did not report a listening address".to_owned())
    }

    /// Sends one request and returns everything written back.
    pub fn send(&self, event: &str, handler: &str) -> Result<String, String> {
        let address = self.address()?;
        exchange(address, format!("{event}\n{handler}\n").as_bytes())
    }

    /// Triggers shutdown and waits for the launch sequence to return.
    pub fn stop(&mut self) -> Result<(), String> {
        self.shutdown.trigger();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "server not running".to_owned())?;
        let result = handle
            .join()
            .map_err(|_| "server thread panicked".to_owned())?;
        self.result = Some(result);
        Ok(())
    }

    pub fn result(&self) -> Option<&LaunchResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&LaunchError> {
        self.result.as_ref()?.as_ref().err()
    }

    pub fn log(&self) -> Result<String, String> {
        fs::read_to_string(self.loader.log_path()).map_err(|error| error.to_string())
    }
}

impl Drop for ServerHarness {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown.trigger();
            if let Some(handle) = self.handle.take() {
                drop(handle.join());
            }
        }
    }
}

/// Writes `request`, half-closes the connection and reads the full answer.
pub fn exchange(address: SocketAddr, request: &[u8]) -> Result<String, String> {
    let mut stream = TcpStream::connect(address).map_err(|error| error.to_string())?;
    stream
        .set_read_timeout(Some(WAIT_TIMEOUT))
        .map_err(|error| error.to_string())?;
    stream.write_all(request).map_err(|error| error.to_string())?;
    stream
        .shutdown(Shutdown::Write)
        .map_err(|error| error.to_string())?;
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .map_err(|error| error.to_string())?;
    Ok(response)
}
