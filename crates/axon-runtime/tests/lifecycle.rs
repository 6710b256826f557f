//! Lifecycle tests across threads: waiting, suspension, and kill
//! semantics for task-style components.

use axon_command::{ExecuteError, ExecuteResult};
use axon_runtime::{Behavior, Component, NullBehavior};
use axon_types::{ComponentState, InterfacePolicy, QueueingPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Ticker {
    ticks: Arc<AtomicUsize>,
}

impl Behavior for Ticker {
    fn run(&mut self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn wait_for_state_from_another_thread() {
    let component = Component::task("t", NullBehavior);
    let waiter = {
        let component = Arc::clone(&component);
        std::thread::spawn(move || {
            component.wait_for_state(ComponentState::Active, Duration::from_secs(5))
        })
    };

    component.create().unwrap();
    component.start().unwrap();
    assert!(waiter.join().unwrap());
    component.kill();
}

#[test]
fn wait_for_state_timeout_returns_false() {
    let component = Component::task("t", NullBehavior);
    component.create().unwrap();
    // Never started; Active cannot arrive.
    assert!(!component.wait_for_state(ComponentState::Active, Duration::from_millis(50)));
    assert_eq!(component.state(), ComponentState::Ready);
    component.kill();
}

#[test]
fn suspend_pauses_run_but_keeps_draining() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let component = Component::task(
        "t",
        Ticker {
            ticks: Arc::clone(&ticks),
        },
    );
    let hits = Arc::new(AtomicUsize::new(0));
    let ctl = component
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    let h = Arc::clone(&hits);
    let poke = ctl
        .add_command_void("Poke", QueueingPolicy::default(), move || {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    component.create().unwrap();
    component.start().unwrap();
    let copy = ctl.get_end_user_interface("test").unwrap();
    copy.call_void(&poke, true).unwrap();

    component.suspend().unwrap();
    let ticks_at_suspend = ticks.load(Ordering::SeqCst);

    // Ready still accepts and drains commands.
    copy.call_void(&poke, true).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    // One in-flight run() may complete after suspend; the count must
    // then stop advancing.
    std::thread::sleep(Duration::from_millis(30));
    let settled = ticks.load(Ordering::SeqCst);
    assert!(settled <= ticks_at_suspend + 1);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(ticks.load(Ordering::SeqCst), settled);

    // Resume and verify run() advances again.
    component.start().unwrap();
    assert!(component.wait_for_state(ComponentState::Active, Duration::from_secs(1)));
    copy.call_void(&poke, true).unwrap();
    component.kill();
    assert!(ticks.load(Ordering::SeqCst) > settled);
}

#[test]
fn kill_joins_run_loop_and_runs_cleanup_once() {
    struct Cleanups {
        count: Arc<AtomicUsize>,
    }
    impl Behavior for Cleanups {
        fn cleanup(&mut self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    let count = Arc::new(AtomicUsize::new(0));
    let component = Component::task(
        "t",
        Cleanups {
            count: Arc::clone(&count),
        },
    );
    component.create().unwrap();
    component.start().unwrap();

    component.kill();
    assert_eq!(component.state(), ComponentState::Finished);
    component.kill();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn kill_answers_blocked_caller_with_terminated() {
    // A server whose handler parks long enough for kill to race in is
    // hard to time; instead block on a never-drained device mailbox.
    let component = Component::device("d", NullBehavior);
    let ctl = component
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    let tick = ctl
        .add_command_void("Tick", QueueingPolicy::default(), || Ok(()))
        .unwrap();
    component.create().unwrap();

    let copy = ctl.get_end_user_interface("test").unwrap();
    let blocked = {
        let copy = Arc::clone(&copy);
        let tick = Arc::clone(&tick);
        std::thread::spawn(move || copy.call_void(&tick, true))
    };
    while copy.mailbox().map_or(0, |m| m.len()) == 0 {
        std::thread::yield_now();
    }

    component.kill();
    assert_eq!(
        blocked.join().unwrap(),
        Err(ExecuteError::ComponentTerminated)
    );
    // Post-kill calls fail immediately.
    assert_eq!(
        copy.call_void(&tick, false),
        Err(ExecuteError::InterfaceDisabled)
    );
}

#[test]
fn failed_startup_leaves_component_ready() {
    struct FailingStartup;
    impl Behavior for FailingStartup {
        fn startup(&mut self) -> ExecuteResult {
            Err(ExecuteError::handler("motor offline"))
        }
    }

    let component = Component::task("t", FailingStartup);
    component.create().unwrap();
    assert!(component.start().is_err());
    assert_eq!(component.state(), ComponentState::Ready);
    component.kill();
}

#[test]
fn blocking_return_round_trip_through_run_loop() {
    let component = Component::task("t", NullBehavior);
    let ctl = component
        .add_provided_interface("ctl", InterfacePolicy::QueueCommands)
        .unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let next = ctl
        .add_command_void_return("NextSequence", QueueingPolicy::default(), move || {
            Ok(c.fetch_add(1, Ordering::SeqCst))
        })
        .unwrap();

    component.create().unwrap();
    component.start().unwrap();

    let copy = ctl.get_end_user_interface("test").unwrap();
    assert_eq!(copy.call_void_return::<usize>(&next).unwrap(), 0);
    assert_eq!(copy.call_void_return::<usize>(&next).unwrap(), 1);
    component.kill();
}
