//! Test application exposing `echo` and `boom` handlers and recording its
//! one-time initialisation calls.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::application::{
    Application, ApplicationError, HandlerError, HandlerRegistry, RequestHandler,
};

/// Application double shared between the server and the assertions.
#[derive(Clone)]
pub struct TestApplication {
    registry: HandlerRegistry,
    state: Arc<ApplicationState>,
}

#[derive(Default)]
struct ApplicationState {
    lifecycle: Mutex<Vec<&'static str>>,
    invocations: Arc<AtomicUsize>,
    fail_boot: AtomicBool,
}

impl TestApplication {
    #[must_use]
    pub fn new() -> Self {
        let state = Arc::new(ApplicationState::default());
        let echo_calls = Arc::clone(&state.invocations);
        let boom_calls = Arc::clone(&state.invocations);
        let registry = HandlerRegistry::new()
            .with_handler(
                "echo",
                move |event: &Value,
                      _: &Value,
                      output: &mut dyn Write|
                      -> Result<Value, HandlerError> {
                    echo_calls.fetch_add(1, Ordering::SeqCst);
                    let name = event.get("name").cloned().unwrap_or(Value::Null);
                    writeln!(output, "echo saw {name}")?;
                    Ok(json!({"echoed": name}))
                },
            )
            .with_handler(
                "boom",
                move |_: &Value, _: &Value, output: &mut dyn Write| -> Result<Value, HandlerError> {
                    boom_calls.fetch_add(1, Ordering::SeqCst);
                    writeln!(output, "boom about to fail")?;
                    Err("boom".into())
                },
            );
        Self { registry, state }
    }

    /// Makes the next boot fail.
    pub fn fail_boot(&self) {
        self.state.fail_boot.store(true, Ordering::SeqCst);
    }

    /// Names of the lifecycle hooks invoked so far, in order.
    pub fn lifecycle(&self) -> Vec<&'static str> {
        self.state
            .lifecycle
            .lock()
            .expect("lifecycle mutex poisoned")
            .clone()
    }

    /// Number of handler invocations across all handlers.
    pub fn invocations(&self) -> usize {
        self.state.invocations.load(Ordering::SeqCst)
    }

    fn record(&self, hook: &'static str) {
        self.state
            .lifecycle
            .lock()
            .expect("lifecycle mutex poisoned")
            .push(hook);
    }
}

impl Application for TestApplication {
    fn boot(&self) -> Result<(), ApplicationError> {
        self.record("boot");
        if self.state.fail_boot.load(Ordering::SeqCst) {
            return Err(ApplicationError::new("boot refused"));
        }
        Ok(())
    }

    fn eager_load(&self) -> Result<(), ApplicationError> {
        self.record("eager_load");
        Ok(())
    }

    fn resolve(&self, handler: &str) -> Option<Arc<dyn RequestHandler>> {
        self.registry.resolve(handler)
    }
}
