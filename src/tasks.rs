//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Task primitives used by the retransmission and delayed-ack timers.
//!
//! `Task` wraps a `tokio::task::JoinHandle` that aborts on drop unless
//! detached. `IntervalTask` and `TimeoutTask` layer a resettable timer on
//! top of it, driven by an internal control channel rather than by
//! mutating shared state from outside the task.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio::{task, time};
use tracing::error;

/// A handle to a spawned task. Dropping it cancels the task unless
/// [`Task::detach`] was called.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
    detached: bool,
}

impl<T> Task<T> {
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future),
            detached: false,
        }
    }

    /// Spawns a supervised task that restarts `spawn_fn` if it panics,
    /// useful for receive loops exposed to adversarial input where a
    /// single malformed message should not bring down the instance.
    pub fn spawn_supervised<F, Fut, R>(spawn_fn: F) -> Task<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
    {
        let join_handle = tokio::spawn(async move {
            loop {
                let worker = Task::spawn(spawn_fn());
                match worker.await {
                    Ok(_) => break,
                    Err(error) if error.is_panic() => {
                        error!("task panicked, restarting...");
                        continue;
                    }
                    Err(error) => {
                        error!(%error, "task failed");
                        break;
                    }
                }
            }
        });
        Task {
            join_handle,
            detached: false,
        }
    }

    pub fn detach(&mut self) {
        self.detached = true;
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, task::JoinError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        Pin::new(&mut self.join_handle).poll(cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if !self.detached {
            self.join_handle.abort();
        }
    }
}

#[derive(Debug)]
enum Message {
    Reset(Option<Duration>),
}

/// A resettable one-shot timer, used for e.g. neighbor dead-interval
/// tracking. Dropping it cancels the timeout.
#[derive(Debug)]
pub struct TimeoutTask {
    _task: Task<()>,
    control: UnboundedSender<Message>,
    next: Arc<Mutex<Instant>>,
}

impl TimeoutTask {
    pub fn new<F, Fut>(timeout: Duration, cb: F) -> TimeoutTask
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let next = Arc::new(Mutex::new(Instant::now() + timeout));
        let next_child = Arc::clone(&next);

        let task = Task::spawn(async move {
            let timeout_fut = time::sleep(timeout);
            tokio::pin!(timeout_fut);

            loop {
                tokio::select! {
                    _ = &mut timeout_fut => {
                        (cb)().await;
                        break;
                    }
                    message = control_rx.recv() => {
                        match message {
                            Some(Message::Reset(new_timeout)) => {
                                let d = new_timeout.unwrap_or(timeout);
                                let next = Instant::now() + d;
                                timeout_fut.as_mut().reset(next);
                                *next_child.lock().unwrap() = next;
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        TimeoutTask {
            _task: task,
            control: control_tx,
            next,
        }
    }

    pub fn reset(&mut self, timeout: Option<Duration>) {
        if self.control.send(Message::Reset(timeout)).is_err() {
            error!("failed to reset timeout");
        }
    }

    pub fn remaining(&self) -> Duration {
        self.next.lock().unwrap().saturating_duration_since(Instant::now())
    }
}

/// A resettable periodic timer, used for per-neighbor retransmission
/// intervals. Dropping it cancels the interval.
#[derive(Debug)]
pub struct IntervalTask {
    _task: Task<()>,
    control: UnboundedSender<Message>,
    next: Arc<Mutex<Instant>>,
}

impl IntervalTask {
    pub fn new<F, Fut>(interval: Duration, tick_on_start: bool, mut cb: F) -> IntervalTask
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let next = Arc::new(Mutex::new(Instant::now() + interval));
        let next_child = Arc::clone(&next);

        let task = Task::spawn(async move {
            let mut interval_fut = if tick_on_start {
                time::interval(interval)
            } else {
                time::interval_at(Instant::now() + interval, interval)
            };

            loop {
                tokio::select! {
                    _ = interval_fut.tick() => {
                        (cb)().await;
                        *next_child.lock().unwrap() = Instant::now() + interval;
                    }
                    message = control_rx.recv() => {
                        match message {
                            Some(Message::Reset(new_interval)) => {
                                let d = new_interval.unwrap_or(interval);
                                interval_fut = time::interval(d);
                                *next_child.lock().unwrap() = Instant::now() + d;
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        IntervalTask {
            _task: task,
            control: control_tx,
            next,
        }
    }

    pub fn reset(&mut self, timeout: Option<Duration>) {
        if self.control.send(Message::Reset(timeout)).is_err() {
            error!("failed to reset interval");
        }
    }

    pub fn remaining(&self) -> Duration {
        self.next.lock().unwrap().saturating_duration_since(Instant::now())
    }
}
