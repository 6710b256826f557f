//! State-history collaborator contract.
//!
//! A history buffer is an external collaborator: the middleware never
//! defines its storage, it only reaches it through ordinary commands.
//! This demo wraps a ring buffer of joint-position samples in a
//! `set_current` write command and a `get_latest` read command, then
//! drives it from a periodic controller task while an operator reads
//! the latest sample over a second connection.

use axon_interface::Requirement;
use axon_runtime::{Behavior, Component, ComponentRegistry, NullBehavior};
use axon_types::{ComponentState, InterfacePolicy, QueueingPolicy};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// One recorded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    sequence: u64,
    position: f64,
}

/// Fixed-capacity ring of samples; oldest entries are overwritten.
struct HistoryBuffer {
    samples: Vec<Sample>,
    capacity: usize,
    next: usize,
}

impl HistoryBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    fn set_current(&mut self, sample: Sample) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    fn get_latest(&self) -> Option<Sample> {
        if self.samples.is_empty() {
            return None;
        }
        let last = (self.next + self.capacity - 1) % self.capacity;
        self.samples.get(last.min(self.samples.len() - 1)).copied()
    }
}

/// Controller that records one sample per run-loop cycle.
struct Controller {
    set_current: axon_interface::FunctionWrite,
    sequence: u64,
}

impl Behavior for Controller {
    fn run(&mut self) {
        self.sequence += 1;
        let sample = Sample {
            sequence: self.sequence,
            position: f64::from(u32::try_from(self.sequence % 360).unwrap_or(0)).to_radians(),
        };
        // Ignore backpressure; the next cycle records a fresh sample.
        let _ = self.set_current.execute(&sample);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let registry = ComponentRegistry::new();

    // History component: the collaborator, reachable only via commands.
    let buffer = Arc::new(Mutex::new(HistoryBuffer::new(256)));
    let history = Component::task("history", NullBehavior);
    let table = history
        .add_provided_interface("table", InterfacePolicy::QueueCommands)
        .unwrap();
    let b = Arc::clone(&buffer);
    table
        .add_command_write("set_current", QueueingPolicy::default(), move |s: &Sample| {
            b.lock().set_current(*s);
            Ok(())
        })
        .unwrap();
    let b = Arc::clone(&buffer);
    table
        .add_command_read("get_latest", move || Ok(b.lock().get_latest()))
        .unwrap();

    // Controller component: writes one sample per cycle. Its function
    // handle is created before the component so the behavior can own it.
    let controller_required = axon_interface::RequiredInterface::new("history");
    let set_current = controller_required
        .add_function_write::<Sample>("set_current", Requirement::Required)
        .unwrap();
    let controller = Component::task_with_period(
        "controller",
        Controller {
            set_current,
            sequence: 0,
        },
        Duration::from_millis(5),
    );
    controller
        .attach_required_interface(controller_required)
        .unwrap();

    // Operator component: reads the latest sample on demand.
    let operator = Component::device("operator", NullBehavior);
    let operator_required = operator.add_required_interface("history").unwrap();
    let get_latest = operator_required
        .add_function_read::<Option<Sample>>("get_latest", Requirement::Required)
        .unwrap();

    registry.add_component(Arc::clone(&history)).unwrap();
    registry.add_component(Arc::clone(&controller)).unwrap();
    registry.add_component(Arc::clone(&operator)).unwrap();

    registry
        .connect("controller", "history", "history", "table")
        .unwrap();
    registry
        .connect("operator", "history", "history", "table")
        .unwrap();

    registry.create_all().unwrap();
    registry.start_all().unwrap();
    assert!(history.wait_for_state(ComponentState::Active, Duration::from_secs(1)));

    std::thread::sleep(Duration::from_millis(100));
    match get_latest.execute::<Option<Sample>>() {
        Ok(Some(sample)) => {
            info!(sequence = sample.sequence, position = sample.position, "latest sample")
        }
        Ok(None) => info!("history still empty"),
        Err(err) => info!(%err, "read failed"),
    }

    registry.kill_all();
}
