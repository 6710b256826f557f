//! Components and their lifecycle state machine.
//!
//! A component bundles a [`Behavior`], a set of provided and required
//! interfaces, and a state machine:
//!
//! ```text
//!                create()           start()
//! Constructed ──► Initializing ──► Ready ◄──► Active
//!      │              (setup)        │ suspend() │ (startup, run loop)
//!      │                             │           │
//!      └───────────── kill() ────────┴───────────┘
//!                        │
//!                        ▼
//!                   Finishing ──► Finished
//!                    (cleanup, flush pending calls)
//! ```
//!
//! Two execution styles exist. A *task* owns a thread: its run loop
//! drains every end-user mailbox and event mailbox each cycle and calls
//! the behavior's `run` hook while `Active`. A *device* owns no thread:
//! commands on its non-queueing interfaces execute inline on the
//! calling thread, and any queueing interfaces it does carry are
//! drained only when the embedding code calls
//! [`process_mailboxes`](Component::process_mailboxes).
//!
//! Every state transition fires the built-in `ChangeState` write event
//! on the component's `Lifecycle` provided interface, so observers
//! react to lifecycle changes without polling.

use crate::behavior::Behavior;
use crate::error::LifecycleError;
use axon_interface::{InterfaceError, ProvidedInterface, RequiredInterface, StateProbe};
use axon_types::{ComponentState, InterfacePolicy};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name of the built-in lifecycle provided interface.
pub const LIFECYCLE_INTERFACE: &str = "Lifecycle";

/// Name of the built-in state-change event on [`LIFECYCLE_INTERFACE`].
pub const CHANGE_STATE_EVENT: &str = "ChangeState";

/// Name of the built-in state read command on [`LIFECYCLE_INTERFACE`].
pub const GET_STATE_COMMAND: &str = "GetState";

/// Whether a component owns a run-loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Owns a thread; mailboxes drain in its run loop.
    Task,
    /// No thread; commands execute inline or via explicit drains.
    Device,
}

struct Inner {
    name: String,
    state: Mutex<ComponentState>,
    state_cv: Condvar,
    behavior: Mutex<Box<dyn Behavior>>,
    provided: RwLock<HashMap<String, Arc<ProvidedInterface>>>,
    required: RwLock<HashMap<String, Arc<RequiredInterface>>>,
}

impl Inner {
    /// Atomically checks and applies a transition, then announces it.
    fn begin_transition(
        &self,
        allowed: impl Fn(ComponentState) -> bool,
        next: ComponentState,
    ) -> Result<(), LifecycleError> {
        {
            let mut state = self.state.lock();
            if !allowed(*state) {
                return Err(LifecycleError::InvalidTransition {
                    from: *state,
                    to: next,
                });
            }
            *state = next;
        }
        self.announce(next);
        Ok(())
    }

    /// Applies a transition unconditionally, then announces it.
    fn force_state(&self, next: ComponentState) {
        *self.state.lock() = next;
        self.announce(next);
    }

    /// Releases a start claim that was never announced. No-op if the
    /// component was killed meanwhile.
    fn revert_claimed_start(&self) {
        let mut state = self.state.lock();
        if *state == ComponentState::Active {
            *state = ComponentState::Ready;
        }
        self.state_cv.notify_all();
    }

    fn announce(&self, next: ComponentState) {
        self.state_cv.notify_all();
        debug!(component = %self.name, state = %next, "state changed");
        let lifecycle = self.provided.read().get(LIFECYCLE_INTERFACE).cloned();
        if let Some(event) = lifecycle.and_then(|i| i.find_event_write(CHANGE_STATE_EVENT)) {
            if let Err(err) = event.fire(&next) {
                warn!(component = %self.name, %err, "state change event failed");
            }
        }
    }

    /// Drains every provided end-user mailbox and required event
    /// mailbox once.
    fn drain_all(&self) -> usize {
        let provided: Vec<_> = self.provided.read().values().cloned().collect();
        let required: Vec<_> = self.required.read().values().cloned().collect();
        provided.iter().map(|p| p.process_mailbox()).sum::<usize>()
            + required.iter().map(|r| r.process_events()).sum::<usize>()
    }

    /// Answers every pending call with `ComponentTerminated` and drops
    /// pending events.
    fn flush_all(&self) {
        for interface in self.provided.read().values() {
            interface.flush_terminated();
        }
        for interface in self.required.read().values() {
            if let Some(mailbox) = interface.event_mailbox() {
                mailbox.flush_terminated();
            }
        }
    }
}

fn run_loop(inner: &Arc<Inner>, period: Duration) {
    debug!(component = %inner.name, "run loop started");
    loop {
        let state = *inner.state.lock();
        if state.is_ending() {
            break;
        }
        inner.drain_all();
        if state == ComponentState::Active {
            inner.behavior.lock().run();
        }
        std::thread::sleep(period);
    }
    inner.behavior.lock().cleanup();
    inner.flush_all();
    inner.force_state(ComponentState::Finished);
    debug!(component = %inner.name, "run loop exited");
}

/// A named component: behavior, interfaces, and lifecycle state.
pub struct Component {
    inner: Arc<Inner>,
    kind: ComponentKind,
    period: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Component {
    /// Creates a task-style component with a 1 ms run-loop period.
    #[must_use]
    pub fn task(name: impl Into<String>, behavior: impl Behavior) -> Arc<Self> {
        Self::task_with_period(name, behavior, Duration::from_millis(1))
    }

    /// Creates a task-style component with an explicit run-loop period.
    #[must_use]
    pub fn task_with_period(
        name: impl Into<String>,
        behavior: impl Behavior,
        period: Duration,
    ) -> Arc<Self> {
        Self::build(name, behavior, ComponentKind::Task, period)
    }

    /// Creates a device-style component (no run-loop thread).
    #[must_use]
    pub fn device(name: impl Into<String>, behavior: impl Behavior) -> Arc<Self> {
        Self::build(name, behavior, ComponentKind::Device, Duration::ZERO)
    }

    fn build(
        name: impl Into<String>,
        behavior: impl Behavior,
        kind: ComponentKind,
        period: Duration,
    ) -> Arc<Self> {
        let inner = Arc::new(Inner {
            name: name.into(),
            state: Mutex::new(ComponentState::Constructed),
            state_cv: Condvar::new(),
            behavior: Mutex::new(Box::new(behavior)),
            provided: RwLock::new(HashMap::new()),
            required: RwLock::new(HashMap::new()),
        });

        // Built-in lifecycle interface. Deliberately no state probe: its
        // commands stay callable in every state, including before Ready.
        let lifecycle =
            ProvidedInterface::new(LIFECYCLE_INTERFACE, InterfacePolicy::DoNotQueueCommands);
        let event = lifecycle.add_event_write::<ComponentState>(CHANGE_STATE_EVENT);
        debug_assert!(event.is_ok());
        let weak = Arc::downgrade(&inner);
        let get_state = lifecycle.add_command_read(GET_STATE_COMMAND, move || {
            Ok(state_of(&weak))
        });
        debug_assert!(get_state.is_ok());
        inner
            .provided
            .write()
            .insert(LIFECYCLE_INTERFACE.to_string(), lifecycle);

        Arc::new(Self {
            inner,
            kind,
            period,
            thread: Mutex::new(None),
        })
    }

    /// Returns the component's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns whether this component owns a run-loop thread.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ComponentState {
        *self.inner.state.lock()
    }

    // === Interfaces ===

    /// Adds a provided interface, wired to this component's state so it
    /// rejects commands outside `Ready`/`Active`.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate interface name (including the built-in
    /// [`LIFECYCLE_INTERFACE`]).
    pub fn add_provided_interface(
        &self,
        name: impl Into<String>,
        policy: InterfacePolicy,
    ) -> Result<Arc<ProvidedInterface>, InterfaceError> {
        let name = name.into();
        let mut provided = self.inner.provided.write();
        if provided.contains_key(&name) {
            return Err(InterfaceError::DuplicateInterface(name));
        }
        let interface = ProvidedInterface::new(name.clone(), policy);
        let weak = Arc::downgrade(&self.inner);
        let probe: StateProbe = Arc::new(move || state_of(&weak));
        interface.set_state_probe(probe);
        provided.insert(name, Arc::clone(&interface));
        Ok(interface)
    }

    /// Looks up a provided interface by name.
    #[must_use]
    pub fn provided_interface(&self, name: &str) -> Option<Arc<ProvidedInterface>> {
        self.inner.provided.read().get(name).cloned()
    }

    /// Returns the built-in lifecycle interface.
    #[must_use]
    pub fn lifecycle_interface(&self) -> Arc<ProvidedInterface> {
        // Inserted at construction and never removed.
        self.inner
            .provided
            .read()
            .get(LIFECYCLE_INTERFACE)
            .cloned()
            .unwrap_or_else(|| {
                ProvidedInterface::new(LIFECYCLE_INTERFACE, InterfacePolicy::DoNotQueueCommands)
            })
    }

    /// Adds a required interface with inline event delivery.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate interface name.
    pub fn add_required_interface(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<RequiredInterface>, InterfaceError> {
        self.insert_required(name.into(), None)
    }

    /// Adds a required interface whose event handlers run on this
    /// component's thread, via an event mailbox of `capacity`.
    pub fn add_required_interface_queued(
        &self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<Arc<RequiredInterface>, InterfaceError> {
        self.insert_required(name.into(), Some(capacity))
    }

    fn insert_required(
        &self,
        name: String,
        capacity: Option<usize>,
    ) -> Result<Arc<RequiredInterface>, InterfaceError> {
        let interface = match capacity {
            Some(capacity) => RequiredInterface::new_queued(name.clone(), capacity),
            None => RequiredInterface::new(name.clone()),
        };
        self.attach_required_interface(Arc::clone(&interface))?;
        Ok(interface)
    }

    /// Attaches a pre-built required interface, registered under its
    /// own name. Useful when a behavior needs its function handles
    /// before the component is constructed.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate interface name.
    pub fn attach_required_interface(
        &self,
        interface: Arc<RequiredInterface>,
    ) -> Result<(), InterfaceError> {
        let name = interface.name().to_string();
        let mut required = self.inner.required.write();
        if required.contains_key(&name) {
            return Err(InterfaceError::DuplicateInterface(name));
        }
        required.insert(name, interface);
        Ok(())
    }

    /// Looks up a required interface by name.
    #[must_use]
    pub fn required_interface(&self, name: &str) -> Option<Arc<RequiredInterface>> {
        self.inner.required.read().get(name).cloned()
    }

    // === Lifecycle ===

    /// Runs `setup` and brings the component to `Ready`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless `Constructed`;
    /// [`LifecycleError::SetupFailed`] if the hook fails, returning the
    /// component to `Constructed` so `create` may be retried.
    pub fn create(&self) -> Result<(), LifecycleError> {
        self.inner
            .begin_transition(|s| s == ComponentState::Constructed, ComponentState::Initializing)?;
        if let Err(err) = self.inner.behavior.lock().setup() {
            warn!(component = %self.inner.name, %err, "setup failed");
            self.inner.force_state(ComponentState::Constructed);
            return Err(LifecycleError::SetupFailed(err.to_string()));
        }
        self.inner.force_state(ComponentState::Ready);
        info!(component = %self.inner.name, "created");
        Ok(())
    }

    /// Runs `startup`, brings the component to `Active`, and spawns the
    /// run loop for task-style components.
    ///
    /// The transition is claimed before the hook runs, so concurrent
    /// `start` calls run `startup` at most once; the losers fail
    /// `InvalidTransition`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless `Ready`;
    /// [`LifecycleError::StartupFailed`] if the hook fails, leaving the
    /// component `Ready`.
    pub fn start(&self) -> Result<(), LifecycleError> {
        {
            let mut state = self.inner.state.lock();
            if *state != ComponentState::Ready {
                return Err(LifecycleError::InvalidTransition {
                    from: *state,
                    to: ComponentState::Active,
                });
            }
            *state = ComponentState::Active;
        }
        if let Err(err) = self.inner.behavior.lock().startup() {
            warn!(component = %self.inner.name, %err, "startup failed");
            self.inner.revert_claimed_start();
            return Err(LifecycleError::StartupFailed(err.to_string()));
        }
        {
            // Killed while starting up: the claim is gone, stay down.
            let state = self.inner.state.lock();
            if *state != ComponentState::Active {
                return Err(LifecycleError::InvalidTransition {
                    from: *state,
                    to: ComponentState::Active,
                });
            }
        }
        self.inner.announce(ComponentState::Active);

        if self.kind == ComponentKind::Task {
            let mut thread = self.thread.lock();
            if thread.is_none() {
                let inner = Arc::clone(&self.inner);
                let period = self.period;
                let name = format!("axon-{}", self.inner.name);
                let handle = std::thread::Builder::new()
                    .name(name)
                    .spawn(move || run_loop(&inner, period));
                match handle {
                    Ok(handle) => *thread = Some(handle),
                    Err(err) => {
                        warn!(component = %self.inner.name, %err, "run loop spawn failed");
                        self.inner.force_state(ComponentState::Ready);
                        return Err(LifecycleError::StartupFailed(err.to_string()));
                    }
                }
            }
        }
        info!(component = %self.inner.name, "started");
        Ok(())
    }

    /// Returns the component from `Active` to `Ready`.
    ///
    /// The run loop keeps draining mailboxes; only the `run` hook
    /// pauses.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless `Active`.
    pub fn suspend(&self) -> Result<(), LifecycleError> {
        self.inner
            .begin_transition(|s| s == ComponentState::Active, ComponentState::Ready)?;
        info!(component = %self.inner.name, "suspended");
        Ok(())
    }

    /// Terminates the component from any state.
    ///
    /// Runs `cleanup` exactly once, answers every pending blocking call
    /// with `ComponentTerminated`, and joins the run loop. Idempotent:
    /// killing a `Finished` component is a no-op.
    pub fn kill(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.is_ending() {
                return;
            }
            *state = ComponentState::Finishing;
        }
        self.inner.announce(ComponentState::Finishing);

        let handle = self.thread.lock().take();
        match handle {
            // The run loop observes Finishing, runs cleanup, flushes,
            // and transitions to Finished before exiting.
            Some(handle) => {
                if handle.join().is_err() {
                    warn!(component = %self.inner.name, "run loop panicked");
                    self.inner.flush_all();
                    self.inner.force_state(ComponentState::Finished);
                }
            }
            None => {
                self.inner.behavior.lock().cleanup();
                self.inner.flush_all();
                self.inner.force_state(ComponentState::Finished);
            }
        }
        info!(component = %self.inner.name, "killed");
    }

    /// Blocks the calling thread until the state equals `target` or the
    /// timeout elapses. Returns `false` on timeout, with no side
    /// effects.
    #[must_use]
    pub fn wait_for_state(&self, target: ComponentState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while *state != target {
            if self.inner.state_cv.wait_until(&mut state, deadline).timed_out() {
                return *state == target;
            }
        }
        true
    }

    /// Drains every mailbox once, for device-style components embedded
    /// in an external loop. Returns the number of calls executed.
    pub fn process_mailboxes(&self) -> usize {
        self.inner.drain_all()
    }
}

fn state_of(inner: &Weak<Inner>) -> ComponentState {
    inner
        .upgrade()
        .map_or(ComponentState::Finished, |i| *i.state.lock())
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
