//! Per-connection mailboxes.
//!
//! A [`Mailbox`] is a bounded queue of pending command invocations owned
//! by one end-user interface copy (or one required interface, for event
//! delivery). It is used single-producer/single-consumer: the producer
//! is the one connection bound to the owning copy, the consumer is the
//! owning component's run loop. No general-purpose mutex is involved —
//! only the channel itself plus a one-shot completion signal for the
//! blocking-return case.
//!
//! # Backpressure
//!
//! `enqueue` never blocks: a full mailbox fails
//! [`MailboxFull`](axon_command::ExecuteError::MailboxFull) immediately
//! and leaves the queue unchanged. Backpressure is surfaced to the
//! caller, not absorbed.
//!
//! # Blocking completions
//!
//! Return-bearing entries carry a one-shot channel
//! (`crossbeam_channel::bounded(1)`), signaled exactly once by the
//! consumer after executing that specific entry. Flushing a mailbox at
//! kill time answers every pending completion with
//! [`ComponentTerminated`](axon_command::ExecuteError::ComponentTerminated)
//! so no producer hangs.

use axon_command::{
    CommandVoid, CommandVoidReturn, CommandWrite, CommandWriteReturn, ErasedWriteHandler,
    ExecuteError, ExecuteResult,
};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// One-shot sender for a void completion.
pub type CompletionSender = Sender<ExecuteResult<()>>;

/// One-shot sender for a boxed return value.
pub type ReturnSender = Sender<ExecuteResult<Box<dyn Any + Send>>>;

/// Mailbox and argument-queue capacities.
///
/// Configurable on a provided interface before its first connection and
/// immutable after. `mailbox` bounds pending invocations per connection;
/// `argument_queue` bounds in-flight arguments per write command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSizes {
    /// Maximum pending invocations per connection.
    pub mailbox: usize,
    /// Maximum in-flight arguments per write command.
    pub argument_queue: usize,
}

impl Default for QueueSizes {
    fn default() -> Self {
        Self {
            mailbox: 64,
            argument_queue: 16,
        }
    }
}

/// A pending command invocation.
///
/// Write-bearing entries carry their boxed argument inline and hold the
/// per-command argument budget they were charged against; the budget is
/// released after execution.
pub enum QueuedCall {
    /// Queued void command, optionally with a blocking completion.
    Void {
        /// Shared command from the canonical map.
        command: Arc<CommandVoid>,
        /// Completion signal for `execute_blocking`.
        done: Option<CompletionSender>,
    },
    /// Queued write command with its boxed argument.
    Write {
        /// Shared command from the canonical map.
        command: Arc<CommandWrite>,
        /// Argument, type-checked before enqueue.
        argument: Box<dyn Any + Send>,
        /// Argument budget charged at enqueue time.
        budget: Option<Arc<AtomicUsize>>,
        /// Completion signal for `execute_blocking`.
        done: Option<CompletionSender>,
    },
    /// Queued void-return command; the caller is blocked on `done`.
    VoidReturn {
        /// Shared command from the canonical map.
        command: Arc<CommandVoidReturn>,
        /// Return channel the caller is blocked on.
        done: ReturnSender,
    },
    /// Queued write-return command; the caller is blocked on `done`.
    WriteReturn {
        /// Shared command from the canonical map.
        command: Arc<CommandWriteReturn>,
        /// Argument, type-checked before enqueue.
        argument: Box<dyn Any + Send>,
        /// Argument budget charged at enqueue time.
        budget: Option<Arc<AtomicUsize>>,
        /// Return channel the caller is blocked on.
        done: ReturnSender,
    },
    /// Queued event delivery for a required interface's handler.
    Event {
        /// Event name, for diagnostics.
        name: String,
        /// The subscribing side's handler.
        handler: ErasedWriteHandler,
        /// Cloned payload.
        payload: Box<dyn Any + Send>,
    },
    /// Queued void event delivery.
    EventVoid {
        /// Event name, for diagnostics.
        name: String,
        /// The subscribing side's handler.
        handler: axon_command::ErasedVoidHandler,
    },
}

impl QueuedCall {
    /// Executes this entry on the consumer thread, releasing budgets
    /// and signaling completions.
    pub fn execute(self) {
        match self {
            Self::Void { command, done } => {
                let result = command.execute();
                signal(done, result, command.name());
            }
            Self::Write {
                command,
                argument,
                budget,
                done,
            } => {
                let result = command.execute_erased(argument.as_ref());
                release(budget);
                signal(done, result, command.name());
            }
            Self::VoidReturn { command, done } => {
                let result = command.execute_erased();
                if done.try_send(result).is_err() {
                    warn!(command = command.name(), "blocked caller gone before completion");
                }
            }
            Self::WriteReturn {
                command,
                argument,
                budget,
                done,
            } => {
                let result = command.execute_erased(argument.as_ref());
                release(budget);
                if done.try_send(result).is_err() {
                    warn!(command = command.name(), "blocked caller gone before completion");
                }
            }
            Self::Event {
                name,
                handler,
                payload,
            } => {
                if let Err(err) = handler(payload.as_ref()) {
                    warn!(event = %name, %err, "queued event handler failed");
                }
            }
            Self::EventVoid { name, handler } => {
                if let Err(err) = handler() {
                    warn!(event = %name, %err, "queued event handler failed");
                }
            }
        }
    }

    /// Discards this entry, answering any blocked caller with
    /// [`ExecuteError::ComponentTerminated`].
    pub fn terminate(self) {
        match self {
            Self::Void { done, .. } => {
                if let Some(tx) = done {
                    let _ = tx.try_send(Err(ExecuteError::ComponentTerminated));
                }
            }
            Self::Write { budget, done, .. } => {
                release(budget);
                if let Some(tx) = done {
                    let _ = tx.try_send(Err(ExecuteError::ComponentTerminated));
                }
            }
            Self::VoidReturn { done, .. } => {
                let _ = done.try_send(Err(ExecuteError::ComponentTerminated));
            }
            Self::WriteReturn { budget, done, .. } => {
                release(budget);
                let _ = done.try_send(Err(ExecuteError::ComponentTerminated));
            }
            Self::Event { .. } | Self::EventVoid { .. } => {}
        }
    }
}

fn signal(done: Option<CompletionSender>, result: ExecuteResult<()>, command: &str) {
    if let Some(tx) = done {
        if tx.try_send(result).is_err() {
            warn!(command, "blocked caller gone before completion");
        }
    }
}

fn release(budget: Option<Arc<AtomicUsize>>) {
    if let Some(counter) = budget {
        counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Bounded single-producer/single-consumer queue of pending commands.
///
/// Created per end-user interface copy (and per required interface, for
/// event delivery). FIFO per producer connection; no ordering guarantee
/// across different connections to the same component.
pub struct Mailbox {
    name: String,
    tx: Sender<QueuedCall>,
    rx: Receiver<QueuedCall>,
    capacity: usize,
}

impl Mailbox {
    /// Creates a mailbox holding at most `capacity` pending calls.
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            name: name.into(),
            tx,
            rx,
            capacity,
        }
    }

    /// Returns the mailbox's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of pending calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if no calls are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Enqueues a call without blocking.
    ///
    /// # Errors
    ///
    /// Fails [`ExecuteError::MailboxFull`] when at capacity — the queue
    /// is unchanged by a rejected enqueue.
    pub fn enqueue(&self, call: QueuedCall) -> ExecuteResult<()> {
        self.tx.try_send(call).map_err(|err| match err {
            TrySendError::Full(rejected) => {
                // Release any charged budget before reporting.
                if let QueuedCall::Write { budget, .. } | QueuedCall::WriteReturn { budget, .. } =
                    rejected
                {
                    release(budget);
                }
                ExecuteError::MailboxFull
            }
            TrySendError::Disconnected(_) => ExecuteError::ComponentTerminated,
        })
    }

    /// Removes the oldest pending call, if any.
    ///
    /// Must be called only from the owning component's run loop.
    #[must_use]
    pub fn drain_one(&self) -> Option<QueuedCall> {
        match self.rx.try_recv() {
            Ok(call) => Some(call),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drains and executes every pending call.
    ///
    /// Returns the number of calls executed.
    pub fn process_all(&self) -> usize {
        let mut processed = 0;
        while let Some(call) = self.drain_one() {
            call.execute();
            processed += 1;
        }
        processed
    }

    /// Drains every pending call, answering blocked callers with
    /// [`ExecuteError::ComponentTerminated`] instead of executing.
    ///
    /// Returns the number of calls flushed.
    pub fn flush_terminated(&self) -> usize {
        let mut flushed = 0;
        while let Some(call) = self.drain_one() {
            call.terminate();
            flushed += 1;
        }
        flushed
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("pending", &self.len())
            .finish()
    }
}
