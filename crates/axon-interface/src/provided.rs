//! Provided interfaces and the end-user interface factory.
//!
//! A provided interface is the service-offering side of a connection: it
//! owns named maps of commands (one disjoint map per shape) and event
//! generators. The *factory* instance owns the canonical maps; every
//! connection gets its own *end-user copy* that shares those maps by
//! reference but owns a private [`Mailbox`] and per-write-command
//! argument budgets.
//!
//! # Why copies?
//!
//! Multiple required interfaces may connect to the same provided
//! interface. If they shared one mailbox, the queue would have multiple
//! producers and the single-producer/single-consumer invariant that
//! keeps the queue lock-minimal would break. The factory converts the
//! shared resource into N independent single-writer/single-reader
//! channels:
//!
//! ```text
//! RequiredInterface A ──► copy "A" mailbox ──┐
//! RequiredInterface B ──► copy "B" mailbox ──┼──► server run loop
//! RequiredInterface C ──► copy "C" mailbox ──┘     (drains each)
//! ```
//!
//! # Population freeze
//!
//! Canonical maps are populated once, before any connection exists, and
//! are read-only thereafter; creating the first end-user copy freezes
//! population. That is what makes call-time lookups safe without a map
//! lock on the hot path.

use crate::error::InterfaceError;
use crate::mailbox::{Mailbox, QueueSizes, QueuedCall};
use axon_command::{
    CommandQualifiedRead, CommandRead, CommandShape, CommandVoid, CommandVoidReturn, CommandWrite,
    CommandWriteReturn, EventVoid, EventWrite, ExecuteError, ExecuteResult,
};
use axon_types::{ComponentState, InterfacePolicy, QueueingPolicy};
use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Snapshot accessor for the owning component's lifecycle state.
///
/// Installed by the component when it creates the interface; consulted
/// on every call to decide whether the interface currently accepts
/// commands.
pub type StateProbe = Arc<dyn Fn() -> ComponentState + Send + Sync>;

#[derive(Default)]
struct CommandMaps {
    void: RwLock<HashMap<String, Arc<CommandVoid>>>,
    read: RwLock<HashMap<String, Arc<CommandRead>>>,
    write: RwLock<HashMap<String, Arc<CommandWrite>>>,
    qualified_read: RwLock<HashMap<String, Arc<CommandQualifiedRead>>>,
    void_return: RwLock<HashMap<String, Arc<CommandVoidReturn>>>,
    write_return: RwLock<HashMap<String, Arc<CommandWriteReturn>>>,
}

#[derive(Default)]
struct EventMaps {
    void: RwLock<HashMap<String, Arc<EventVoid>>>,
    write: RwLock<HashMap<String, Arc<EventWrite>>>,
}

/// The service-offering side of a connection.
///
/// See the module docs for the factory / end-user-copy split. All
/// population methods are factory-only and fail after the first
/// connection; call paths work on end-user copies (and directly on the
/// factory for non-queueing interfaces, which are shared rather than
/// copied).
pub struct ProvidedInterface {
    name: String,
    policy: InterfacePolicy,
    sizes: RwLock<QueueSizes>,
    commands: Arc<CommandMaps>,
    events: Arc<EventMaps>,
    state_probe: RwLock<Option<StateProbe>>,
    frozen: AtomicBool,
    /// Factory-only: live end-user copies, keyed by user name.
    copies: Mutex<HashMap<String, Arc<ProvidedInterface>>>,
    /// Copy-only: the connecting user's name.
    user: Option<String>,
    /// Copy-only: this connection's private command queue.
    mailbox: Option<Mailbox>,
    /// Copy-only: per-write-command in-flight argument counters.
    budgets: Mutex<HashMap<String, Arc<AtomicUsize>>>,
    /// Copy-only: back-reference to the factory.
    original: Weak<ProvidedInterface>,
    /// Copy-only: set while the run loop is executing drained calls.
    processing: AtomicBool,
}

impl ProvidedInterface {
    /// Creates an empty factory interface.
    #[must_use]
    pub fn new(name: impl Into<String>, policy: InterfacePolicy) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            policy,
            sizes: RwLock::new(QueueSizes::default()),
            commands: Arc::new(CommandMaps::default()),
            events: Arc::new(EventMaps::default()),
            state_probe: RwLock::new(None),
            frozen: AtomicBool::new(false),
            copies: Mutex::new(HashMap::new()),
            user: None,
            mailbox: None,
            budgets: Mutex::new(HashMap::new()),
            original: Weak::new(),
            processing: AtomicBool::new(false),
        })
    }

    /// Returns the interface's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the interface's queueing policy.
    #[must_use]
    pub fn policy(&self) -> InterfacePolicy {
        self.policy
    }

    /// Returns the configured queue sizes.
    #[must_use]
    pub fn sizes(&self) -> QueueSizes {
        *self.sizes.read()
    }

    /// Reconfigures mailbox and argument-queue sizes.
    ///
    /// # Errors
    ///
    /// Fails [`InterfaceError::PopulationFrozen`] once any end-user
    /// copy exists; sizes are immutable after the first connection.
    pub fn set_queue_sizes(&self, sizes: QueueSizes) -> Result<(), InterfaceError> {
        self.ensure_population_open()?;
        *self.sizes.write() = sizes;
        Ok(())
    }

    /// Installs the owning component's state probe.
    ///
    /// Propagated to existing copies; copies created later inherit it.
    pub fn set_state_probe(&self, probe: StateProbe) {
        *self.state_probe.write() = Some(Arc::clone(&probe));
        for copy in self.copies.lock().values() {
            *copy.state_probe.write() = Some(Arc::clone(&probe));
        }
    }

    /// Returns `true` if this is an end-user copy rather than the
    /// factory.
    #[must_use]
    pub fn is_end_user_copy(&self) -> bool {
        self.user.is_some()
    }

    /// Returns the connecting user's name on an end-user copy.
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns this copy's mailbox, if it owns one.
    #[must_use]
    pub fn mailbox(&self) -> Option<&Mailbox> {
        self.mailbox.as_ref()
    }

    /// Returns the factory this copy was cloned from.
    #[must_use]
    pub fn original(&self) -> Option<Arc<ProvidedInterface>> {
        self.original.upgrade()
    }

    /// Returns the number of live end-user copies.
    #[must_use]
    pub fn end_user_count(&self) -> usize {
        self.copies.lock().len()
    }

    fn ensure_population_open(&self) -> Result<(), InterfaceError> {
        if self.user.is_some() {
            return Err(InterfaceError::NotFactory);
        }
        if self.frozen.load(Ordering::Acquire) {
            return Err(InterfaceError::PopulationFrozen);
        }
        Ok(())
    }

    // === Population (factory-only, before first connection) ===

    /// Adds a void command.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name within the void map, on an end-user
    /// copy, or after the first connection.
    pub fn add_command_void(
        &self,
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn() -> ExecuteResult + Send + Sync + 'static,
    ) -> Result<Arc<CommandVoid>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.void.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandVoid::new(name.clone(), policy, callable));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a read command.
    pub fn add_command_read<R: Any + Send>(
        &self,
        name: impl Into<String>,
        callable: impl Fn() -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Result<Arc<CommandRead>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.read.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandRead::new(name.clone(), callable));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a write command.
    pub fn add_command_write<T: Any + Send>(
        &self,
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn(&T) -> ExecuteResult + Send + Sync + 'static,
    ) -> Result<Arc<CommandWrite>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.write.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandWrite::new(name.clone(), policy, callable));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a filtered write: a qualified-read filter immediately
    /// followed by a write on the filter's output, stored under the
    /// write shape. See [`CommandWrite::filtered`] for atomicity.
    pub fn add_command_filtered_write<T: Any + Send, U: Any + Send>(
        &self,
        name: impl Into<String>,
        policy: QueueingPolicy,
        filter: impl Fn(&T) -> ExecuteResult<U> + Send + Sync + 'static,
        write: impl Fn(&U) -> ExecuteResult + Send + Sync + 'static,
    ) -> Result<Arc<CommandWrite>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.write.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandWrite::filtered(name.clone(), policy, filter, write));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a qualified-read command.
    pub fn add_command_qualified_read<T: Any + Send, R: Any + Send>(
        &self,
        name: impl Into<String>,
        callable: impl Fn(&T) -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Result<Arc<CommandQualifiedRead>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.qualified_read.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandQualifiedRead::new(name.clone(), callable));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a void-return command.
    pub fn add_command_void_return<R: Any + Send>(
        &self,
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn() -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Result<Arc<CommandVoidReturn>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.void_return.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandVoidReturn::new(name.clone(), policy, callable));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a write-return command.
    pub fn add_command_write_return<T: Any + Send, R: Any + Send>(
        &self,
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn(&T) -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Result<Arc<CommandWriteReturn>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.commands.write_return.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateCommand(name));
        }
        let command = Arc::new(CommandWriteReturn::new(name.clone(), policy, callable));
        map.insert(name, Arc::clone(&command));
        Ok(command)
    }

    /// Adds a void event generator.
    pub fn add_event_void(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<EventVoid>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.events.void.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateEvent(name));
        }
        let event = Arc::new(EventVoid::new(name.clone()));
        map.insert(name, Arc::clone(&event));
        Ok(event)
    }

    /// Adds a write event generator with payload type `T`.
    pub fn add_event_write<T: Any>(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<EventWrite>, InterfaceError> {
        self.ensure_population_open()?;
        let name = name.into();
        let mut map = self.events.write.write();
        if map.contains_key(&name) {
            return Err(InterfaceError::DuplicateEvent(name));
        }
        let event = Arc::new(EventWrite::new::<T>(name.clone()));
        map.insert(name, Arc::clone(&event));
        Ok(event)
    }

    // === Lookup (shared maps, shape-keyed) ===

    /// Looks up a void command by name.
    #[must_use]
    pub fn find_command_void(&self, name: &str) -> Option<Arc<CommandVoid>> {
        self.commands.void.read().get(name).cloned()
    }

    /// Looks up a read command by name.
    #[must_use]
    pub fn find_command_read(&self, name: &str) -> Option<Arc<CommandRead>> {
        self.commands.read.read().get(name).cloned()
    }

    /// Looks up a write command by name.
    #[must_use]
    pub fn find_command_write(&self, name: &str) -> Option<Arc<CommandWrite>> {
        self.commands.write.read().get(name).cloned()
    }

    /// Looks up a qualified-read command by name.
    #[must_use]
    pub fn find_command_qualified_read(&self, name: &str) -> Option<Arc<CommandQualifiedRead>> {
        self.commands.qualified_read.read().get(name).cloned()
    }

    /// Looks up a void-return command by name.
    #[must_use]
    pub fn find_command_void_return(&self, name: &str) -> Option<Arc<CommandVoidReturn>> {
        self.commands.void_return.read().get(name).cloned()
    }

    /// Looks up a write-return command by name.
    #[must_use]
    pub fn find_command_write_return(&self, name: &str) -> Option<Arc<CommandWriteReturn>> {
        self.commands.write_return.read().get(name).cloned()
    }

    /// Returns the shape of the command registered under `name`.
    ///
    /// Command names are unique across shapes in practice; if a name
    /// were reused, the first shape in declaration-order wins.
    #[must_use]
    pub fn command_shape(&self, name: &str) -> Option<CommandShape> {
        let c = &self.commands;
        None.or_else(|| c.void.read().get(name).map(|c| c.shape()))
            .or_else(|| c.read.read().get(name).map(|c| c.shape()))
            .or_else(|| c.write.read().get(name).map(|c| c.shape()))
            .or_else(|| c.qualified_read.read().get(name).map(|c| c.shape()))
            .or_else(|| c.void_return.read().get(name).map(|c| c.shape()))
            .or_else(|| c.write_return.read().get(name).map(|c| c.shape()))
    }

    /// Looks up a void event generator by name.
    #[must_use]
    pub fn find_event_void(&self, name: &str) -> Option<Arc<EventVoid>> {
        self.events.void.read().get(name).cloned()
    }

    /// Looks up a write event generator by name.
    #[must_use]
    pub fn find_event_write(&self, name: &str) -> Option<Arc<EventWrite>> {
        self.events.write.read().get(name).cloned()
    }

    /// Removes this user's subscriptions from every event generator.
    pub fn unsubscribe_all(&self, user: &str) {
        for event in self.events.void.read().values() {
            event.unsubscribe(user);
        }
        for event in self.events.write.read().values() {
            event.unsubscribe(user);
        }
    }

    // === End-user interface factory ===

    /// Returns the end-user interface for `user_name`.
    ///
    /// Idempotent per user name: an existing copy is returned as-is,
    /// otherwise a new copy is constructed with a fresh mailbox and
    /// argument budgets and registered in the factory's copy list. The
    /// first copy freezes population.
    ///
    /// Non-queueing interfaces are shared rather than copied: the
    /// factory itself is returned and calls execute inline.
    ///
    /// # Errors
    ///
    /// Fails [`InterfaceError::NotFactory`] on an end-user copy.
    pub fn get_end_user_interface(
        self: &Arc<Self>,
        user_name: impl Into<String>,
    ) -> Result<Arc<ProvidedInterface>, InterfaceError> {
        if self.user.is_some() {
            return Err(InterfaceError::NotFactory);
        }
        self.frozen.store(true, Ordering::Release);
        if !self.policy.is_queued() {
            return Ok(Arc::clone(self));
        }

        let user_name = user_name.into();
        let mut copies = self.copies.lock();
        if let Some(existing) = copies.get(&user_name) {
            return Ok(Arc::clone(existing));
        }

        let sizes = *self.sizes.read();
        let copy = Arc::new(ProvidedInterface {
            name: self.name.clone(),
            policy: self.policy,
            sizes: RwLock::new(sizes),
            commands: Arc::clone(&self.commands),
            events: Arc::clone(&self.events),
            state_probe: RwLock::new(self.state_probe.read().clone()),
            frozen: AtomicBool::new(true),
            copies: Mutex::new(HashMap::new()),
            user: Some(user_name.clone()),
            mailbox: Some(Mailbox::new(
                format!("{}/{}", self.name, user_name),
                sizes.mailbox,
            )),
            budgets: Mutex::new(HashMap::new()),
            original: Arc::downgrade(self),
            processing: AtomicBool::new(false),
        });
        debug!(interface = %self.name, user = %user_name, "created end-user interface");
        copies.insert(user_name, Arc::clone(&copy));
        Ok(copy)
    }

    /// Destroys the end-user copy for `user_name`.
    ///
    /// The copy is removed only if its mailbox is empty and no command
    /// is mid-execution; otherwise the caller should drain and retry.
    ///
    /// # Errors
    ///
    /// [`InterfaceError::CopyBusy`] while in-flight data remains,
    /// [`InterfaceError::UnknownUser`] if no such copy exists.
    pub fn remove_end_user_interface(&self, user_name: &str) -> Result<(), InterfaceError> {
        if self.user.is_some() {
            return Err(InterfaceError::NotFactory);
        }
        if !self.policy.is_queued() {
            // Shared factory; nothing was cloned for this user.
            return Ok(());
        }

        let mut copies = self.copies.lock();
        let copy = copies
            .get(user_name)
            .ok_or_else(|| InterfaceError::UnknownUser(user_name.to_string()))?;

        let busy = copy.processing.load(Ordering::Acquire)
            || copy.mailbox.as_ref().is_some_and(|m| !m.is_empty());
        if busy {
            return Err(InterfaceError::CopyBusy(user_name.to_string()));
        }

        copies.remove(user_name);
        debug!(interface = %self.name, user = %user_name, "removed end-user interface");
        Ok(())
    }

    // === Call paths (used by bound function slots) ===

    pub(crate) fn accepts_commands(&self) -> bool {
        match self.state_probe.read().as_ref() {
            Some(probe) => probe().accepts_commands(),
            // Standalone interfaces (no owning component) accept.
            None => true,
        }
    }

    fn queue_for(&self, policy: QueueingPolicy) -> Option<&Mailbox> {
        self.mailbox
            .as_ref()
            .filter(|_| policy.resolves_queued(self.policy))
    }

    fn charge_budget(&self, command: &str) -> ExecuteResult<Arc<AtomicUsize>> {
        let limit = self.sizes.read().argument_queue;
        let counter = Arc::clone(
            self.budgets
                .lock()
                .entry(command.to_string())
                .or_insert_with(|| Arc::new(AtomicUsize::new(0))),
        );
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|_| ExecuteError::MailboxFull)?;
        Ok(counter)
    }

    /// Executes or enqueues a void command per the resolved policy.
    pub fn call_void(&self, command: &Arc<CommandVoid>, blocking: bool) -> ExecuteResult {
        if !self.accepts_commands() {
            return Err(ExecuteError::InterfaceDisabled);
        }
        match self.queue_for(command.policy()) {
            Some(mailbox) if blocking => {
                let (tx, rx) = bounded(1);
                mailbox.enqueue(QueuedCall::Void {
                    command: Arc::clone(command),
                    done: Some(tx),
                })?;
                rx.recv().unwrap_or(Err(ExecuteError::ComponentTerminated))
            }
            Some(mailbox) => mailbox.enqueue(QueuedCall::Void {
                command: Arc::clone(command),
                done: None,
            }),
            None => command.execute(),
        }
    }

    /// Executes or enqueues a write command per the resolved policy.
    ///
    /// Queued calls clone the argument into the mailbox envelope after
    /// the type check, and charge the command's argument budget.
    pub fn call_write<T: Any + Send + Clone>(
        &self,
        command: &Arc<CommandWrite>,
        arg: &T,
        blocking: bool,
    ) -> ExecuteResult {
        if !self.accepts_commands() {
            return Err(ExecuteError::InterfaceDisabled);
        }
        command.arg_spec().check(arg)?;
        match self.queue_for(command.policy()) {
            Some(mailbox) if blocking => {
                let budget = self.charge_budget(command.name())?;
                let (tx, rx) = bounded(1);
                mailbox.enqueue(QueuedCall::Write {
                    command: Arc::clone(command),
                    argument: Box::new(arg.clone()),
                    budget: Some(budget),
                    done: Some(tx),
                })?;
                rx.recv().unwrap_or(Err(ExecuteError::ComponentTerminated))
            }
            Some(mailbox) => {
                let budget = self.charge_budget(command.name())?;
                mailbox.enqueue(QueuedCall::Write {
                    command: Arc::clone(command),
                    argument: Box::new(arg.clone()),
                    budget: Some(budget),
                    done: None,
                })
            }
            None => command.execute(arg),
        }
    }

    /// Executes a void-return command, blocking through the queue.
    ///
    /// The result is required before return, so under a queueing
    /// interface the calling thread blocks until the server thread has
    /// drained and executed this entry.
    pub fn call_void_return<R: Any + Send>(
        &self,
        command: &Arc<CommandVoidReturn>,
    ) -> ExecuteResult<R> {
        if !self.accepts_commands() {
            return Err(ExecuteError::InterfaceDisabled);
        }
        command.result_spec().check_type::<R>()?;
        match self.queue_for(command.policy()) {
            Some(mailbox) => {
                let (tx, rx) = bounded(1);
                mailbox.enqueue(QueuedCall::VoidReturn {
                    command: Arc::clone(command),
                    done: tx,
                })?;
                let boxed = rx.recv().unwrap_or(Err(ExecuteError::ComponentTerminated))?;
                downcast_result(boxed, command.result_spec().type_name())
            }
            None => command.execute::<R>(),
        }
    }

    /// Executes a write-return command, blocking through the queue.
    pub fn call_write_return<T: Any + Send + Clone, R: Any + Send>(
        &self,
        command: &Arc<CommandWriteReturn>,
        arg: &T,
    ) -> ExecuteResult<R> {
        if !self.accepts_commands() {
            return Err(ExecuteError::InterfaceDisabled);
        }
        command.arg_spec().check(arg)?;
        command.result_spec().check_type::<R>()?;
        match self.queue_for(command.policy()) {
            Some(mailbox) => {
                let budget = self.charge_budget(command.name())?;
                let (tx, rx) = bounded(1);
                mailbox.enqueue(QueuedCall::WriteReturn {
                    command: Arc::clone(command),
                    argument: Box::new(arg.clone()),
                    budget: Some(budget),
                    done: tx,
                })?;
                let boxed = rx.recv().unwrap_or(Err(ExecuteError::ComponentTerminated))?;
                downcast_result(boxed, command.result_spec().type_name())
            }
            None => command.execute::<T, R>(arg),
        }
    }

    // === Drain (owning component's run loop only) ===

    /// Drains and executes every pending call.
    ///
    /// On the factory, drains every end-user copy. Returns the number
    /// of calls executed.
    pub fn process_mailbox(&self) -> usize {
        let Some(mailbox) = self.mailbox.as_ref() else {
            let copies: Vec<_> = self.copies.lock().values().cloned().collect();
            return copies.iter().map(|c| c.process_mailbox()).sum();
        };
        self.processing.store(true, Ordering::Release);
        let processed = mailbox.process_all();
        self.processing.store(false, Ordering::Release);
        processed
    }

    /// Flushes every pending call with
    /// [`ExecuteError::ComponentTerminated`], on the factory and all
    /// copies. Called at kill time so no blocked producer hangs.
    pub fn flush_terminated(&self) -> usize {
        let Some(mailbox) = self.mailbox.as_ref() else {
            let copies: Vec<_> = self.copies.lock().values().cloned().collect();
            return copies.iter().map(|c| c.flush_terminated()).sum();
        };
        mailbox.flush_terminated()
    }
}

fn downcast_result<R: Any + Send>(
    boxed: Box<dyn Any + Send>,
    expected: &'static str,
) -> ExecuteResult<R> {
    boxed
        .downcast::<R>()
        .map(|b| *b)
        .map_err(|_| ExecuteError::TypeMismatch {
            expected: expected.to_string(),
            found: "<erased>".to_string(),
        })
}

impl std::fmt::Debug for ProvidedInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidedInterface")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("end_user_copy", &self.is_end_user_copy())
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    fn queued_interface() -> Arc<ProvidedInterface> {
        ProvidedInterface::new("p1", InterfacePolicy::QueueCommands)
    }

    #[test]
    fn duplicate_command_fails_without_mutating_existing() {
        let interface = queued_interface();
        let first = interface
            .add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
            .unwrap();

        let err = interface
            .add_command_void("Tick", QueueingPolicy::default(), || {
                Err(ExecuteError::handler("imposter"))
            })
            .unwrap_err();
        assert_eq!(err, InterfaceError::DuplicateCommand("Tick".into()));

        // The original entry is untouched.
        let found = interface.find_command_void("Tick").unwrap();
        assert!(Arc::ptr_eq(&first, &found));
        assert!(found.execute().is_ok());
    }

    #[test]
    fn same_name_allowed_across_shapes() {
        let interface = queued_interface();
        interface
            .add_command_void("X", QueueingPolicy::default(), || Ok(()))
            .unwrap();
        interface.add_command_read("X", || Ok(1i32)).unwrap();
        assert!(interface.find_command_void("X").is_some());
        assert!(interface.find_command_read("X").is_some());
    }

    #[test]
    fn command_shape_reports_registered_shape() {
        let interface = queued_interface();
        interface
            .add_command_write("SetValue", QueueingPolicy::default(), |_: &i32| Ok(()))
            .unwrap();
        interface
            .add_command_void_return::<u8>("Home", QueueingPolicy::default(), || Ok(0u8))
            .unwrap();

        assert_eq!(interface.command_shape("SetValue"), Some(CommandShape::Write));
        assert_eq!(interface.command_shape("Home"), Some(CommandShape::VoidReturn));
        assert_eq!(interface.command_shape("Nope"), None);
    }

    #[test]
    fn population_frozen_after_first_copy() {
        let interface = queued_interface();
        interface
            .add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
            .unwrap();
        let _copy = interface.get_end_user_interface("client").unwrap();

        let err = interface
            .add_command_void("Tock", QueueingPolicy::default(), || Ok(()))
            .unwrap_err();
        assert_eq!(err, InterfaceError::PopulationFrozen);
        assert_eq!(
            interface.set_queue_sizes(QueueSizes::default()),
            Err(InterfaceError::PopulationFrozen)
        );
    }

    #[test]
    fn end_user_interface_idempotent_per_user() {
        let interface = queued_interface();
        let a1 = interface.get_end_user_interface("a").unwrap();
        let a2 = interface.get_end_user_interface("a").unwrap();
        let b = interface.get_end_user_interface("b").unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(interface.end_user_count(), 2);
        assert!(a1.is_end_user_copy());
        assert!(a1.original().is_some());
    }

    #[test]
    fn non_queueing_interface_is_shared_not_copied() {
        let interface = ProvidedInterface::new("dev", InterfacePolicy::DoNotQueueCommands);
        let shared = interface.get_end_user_interface("a").unwrap();
        assert!(Arc::ptr_eq(&interface, &shared));
        assert!(shared.mailbox().is_none());
        assert!(interface.remove_end_user_interface("a").is_ok());
    }

    #[test]
    fn queued_write_executes_on_drain() {
        let interface = queued_interface();
        let state = Arc::new(PlMutex::new(-1i32));
        let s = Arc::clone(&state);
        let set = interface
            .add_command_write("SetValue", QueueingPolicy::default(), move |v: &i32| {
                *s.lock() = *v;
                Ok(())
            })
            .unwrap();

        let copy = interface.get_end_user_interface("client").unwrap();
        copy.call_write(&set, &42i32, false).unwrap();

        // Not applied until the owning run loop drains.
        assert_eq!(*state.lock(), -1);
        assert_eq!(copy.process_mailbox(), 1);
        assert_eq!(*state.lock(), 42);
    }

    #[test]
    fn factory_drains_every_copy() {
        let interface = queued_interface();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let tick = interface
            .add_command_void("Tick", QueueingPolicy::default(), move || {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        let a = interface.get_end_user_interface("a").unwrap();
        let b = interface.get_end_user_interface("b").unwrap();
        a.call_void(&tick, false).unwrap();
        b.call_void(&tick, false).unwrap();

        assert_eq!(interface.process_mailbox(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn mailbox_full_surfaces_to_producer() {
        let interface = queued_interface();
        interface
            .set_queue_sizes(QueueSizes {
                mailbox: 2,
                argument_queue: 16,
            })
            .unwrap();
        let tick = interface
            .add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
            .unwrap();

        let copy = interface.get_end_user_interface("client").unwrap();
        copy.call_void(&tick, false).unwrap();
        copy.call_void(&tick, false).unwrap();
        assert_eq!(
            copy.call_void(&tick, false),
            Err(ExecuteError::MailboxFull)
        );
        assert_eq!(copy.mailbox().unwrap().len(), 2);
    }

    #[test]
    fn argument_budget_bounds_inflight_writes() {
        let interface = queued_interface();
        interface
            .set_queue_sizes(QueueSizes {
                mailbox: 64,
                argument_queue: 2,
            })
            .unwrap();
        let set = interface
            .add_command_write("Set", QueueingPolicy::default(), |_: &i32| Ok(()))
            .unwrap();

        let copy = interface.get_end_user_interface("client").unwrap();
        copy.call_write(&set, &1i32, false).unwrap();
        copy.call_write(&set, &2i32, false).unwrap();
        assert_eq!(
            copy.call_write(&set, &3i32, false),
            Err(ExecuteError::MailboxFull)
        );

        // Draining releases the budget.
        copy.process_mailbox();
        assert!(copy.call_write(&set, &4i32, false).is_ok());
    }

    #[test]
    fn state_probe_disables_interface() {
        let interface = queued_interface();
        let tick = interface
            .add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
            .unwrap();
        interface.set_state_probe(Arc::new(|| ComponentState::Constructed));

        let copy = interface.get_end_user_interface("client").unwrap();
        assert_eq!(
            copy.call_void(&tick, false),
            Err(ExecuteError::InterfaceDisabled)
        );
    }

    #[test]
    fn remove_end_user_interface_refuses_while_pending() {
        let interface = queued_interface();
        let tick = interface
            .add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
            .unwrap();
        let copy = interface.get_end_user_interface("client").unwrap();
        copy.call_void(&tick, false).unwrap();

        assert_eq!(
            interface.remove_end_user_interface("client"),
            Err(InterfaceError::CopyBusy("client".into()))
        );

        copy.process_mailbox();
        assert!(interface.remove_end_user_interface("client").is_ok());
        assert_eq!(
            interface.remove_end_user_interface("client"),
            Err(InterfaceError::UnknownUser("client".into()))
        );
    }

    #[test]
    fn write_return_round_trips_through_queue() {
        let interface = queued_interface();
        let state = Arc::new(PlMutex::new(10i32));
        let s = Arc::clone(&state);
        let add = interface
            .add_command_write_return("AddAndGet", QueueingPolicy::default(), move |v: &i32| {
                let mut guard = s.lock();
                *guard += *v;
                Ok(*guard)
            })
            .unwrap();

        let copy = interface.get_end_user_interface("client").unwrap();

        // Drain from another thread so the blocking call can complete.
        let drainer = {
            let copy = Arc::clone(&copy);
            std::thread::spawn(move || {
                while copy.process_mailbox() == 0 {
                    std::thread::yield_now();
                }
            })
        };

        let result: i32 = copy.call_write_return(&add, &5i32).unwrap();
        assert_eq!(result, 15);
        drainer.join().unwrap();
    }
}
