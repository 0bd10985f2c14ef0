//! Cooperative task scheduler.
//!
//! Application logic is written as linear `async` routines ("connect, then
//! wait, then loop") while actually executing as a sequence of host-driven
//! callback resumptions. The scheduler bridges the two models: it is a
//! minimal single-threaded executor whose only wake source is the host
//! timer surface.
//!
//! # Execution model
//!
//! - [`Scheduler::spawn`] registers a routine and polls it synchronously up
//!   to its first suspension point before returning (run-to-first-suspend).
//!   A single dispatch tick must not block, so a segment between suspension
//!   points runs to completion without interruption.
//! - [`Scheduler::sleep`] produces a future that arms a one-shot host timer
//!   on first poll. When the timer fires, the host callback wakes the task
//!   and drains the ready queue; the routine resumes exactly where it
//!   suspended, on the host's dispatch thread. Resumption never happens from
//!   a direct call.
//! - Resumptions are processed in host callback delivery order (FIFO ready
//!   queue). Timers due in the same host tick fire in registration order.
//!   There is no priority and no preemption.
//!
//! # Failure boundary
//!
//! A routine that returns `Err` is caught here: the failure is logged,
//! reported on the host's non-fatal channel, and the task is discarded. One
//! failing task never halts the scheduler or other tasks.
//!
//! # Cancellation
//!
//! Not provided. A task runs to completion or failure; routines that can
//! become stale (for example after a workspace disconnect) re-check state
//! after each suspension point.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    future::Future,
    pin::Pin,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll, Wake, Waker},
    time::Duration,
};

use futures::{FutureExt, future::LocalBoxFuture};
use moorline_host::{Host, HostStatus};

use crate::error::TaskError;

type TaskFuture = LocalBoxFuture<'static, Result<(), TaskError>>;

/// Unique identity of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// Handle returned by [`Scheduler::spawn`].
///
/// Purely observational: holding or dropping it has no effect on the task.
#[derive(Debug, Clone, Copy)]
pub struct TaskHandle {
    id: TaskId,
}

impl TaskHandle {
    /// Identity of the spawned task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }
}

struct TaskEntry {
    /// `None` while the future is temporarily removed for polling.
    future: Option<TaskFuture>,
}

struct TaskTable {
    entries: HashMap<TaskId, TaskEntry>,
    next_id: u64,
}

/// Wakes a task by enqueueing its id on the shared ready queue.
///
/// `std::task::Wake` requires `Send + Sync`, so the queue sits behind an
/// `Arc<Mutex>` even though all execution happens on the host's single
/// dispatch thread. Draining is always triggered from a host callback, never
/// from the waker itself.
struct TaskWaker {
    id: TaskId,
    ready: Arc<Mutex<VecDeque<TaskId>>>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        lock_ready(&self.ready).push_back(self.id);
    }
}

/// Recover the queue even if a panic poisoned the lock; the queue itself is
/// never left in a torn state.
fn lock_ready(ready: &Mutex<VecDeque<TaskId>>) -> MutexGuard<'_, VecDeque<TaskId>> {
    match ready.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Single-threaded cooperative task scheduler.
///
/// Cheaply cloneable handle; clones share the same task table and ready
/// queue. Owns every task from spawn until its outcome is reported.
#[derive(Clone)]
pub struct Scheduler {
    host: Rc<dyn Host>,
    tasks: Rc<RefCell<TaskTable>>,
    ready: Arc<Mutex<VecDeque<TaskId>>>,
}

impl Scheduler {
    /// Create a scheduler bound to a host bridge.
    ///
    /// Passive until something is spawned; creating it registers nothing
    /// with the host.
    #[must_use]
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            host,
            tasks: Rc::new(RefCell::new(TaskTable { entries: HashMap::new(), next_id: 0 })),
            ready: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// The host bridge this scheduler resumes through.
    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// Register a routine for execution.
    ///
    /// The routine starts running synchronously, up to its first suspension
    /// point (or completion, if it never suspends), before `spawn` returns.
    pub fn spawn<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = Result<(), TaskError>> + 'static,
    {
        let id = {
            let mut tasks = self.tasks.borrow_mut();
            let id = TaskId(tasks.next_id);
            tasks.next_id += 1;
            tasks.entries.insert(id, TaskEntry { future: Some(future.boxed_local()) });
            id
        };
        tracing::debug!(task = id.0, "task spawned");
        self.poll_task(id);
        TaskHandle { id }
    }

    /// Suspend the calling routine for at least `duration`.
    ///
    /// The returned future arms a one-shot host timer on first poll; the
    /// routine resumes only via that timer's callback, never earlier and
    /// never from a direct call. Timeout-vs-socket races are a caller
    /// composition on top of this primitive.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep { scheduler: self.clone(), duration, state: SleepState::Idle }
    }

    /// Number of live (running or suspended) tasks.
    #[must_use]
    pub fn live_tasks(&self) -> usize {
        self.tasks.borrow().entries.len()
    }

    /// Whether the task is still live.
    #[must_use]
    pub fn is_live(&self, id: TaskId) -> bool {
        self.tasks.borrow().entries.contains_key(&id)
    }

    /// Poll every task currently on the ready queue, in wake order.
    ///
    /// Invoked from host timer callbacks after a wake; safe to call when the
    /// queue is empty.
    pub fn run_ready(&self) {
        loop {
            // The guard drops before the poll; a routine resumed here may
            // wake further tasks, which this same drain then picks up.
            let next = lock_ready(&self.ready).pop_front();
            let Some(id) = next else { break };
            self.poll_task(id);
        }
    }

    /// Poll one task. The future is removed from the table for the duration
    /// of the poll, so a routine may re-enter the scheduler (spawn, sleep)
    /// without tripping a borrow.
    fn poll_task(&self, id: TaskId) {
        let Some(mut future) =
            self.tasks.borrow_mut().entries.get_mut(&id).and_then(|entry| entry.future.take())
        else {
            return;
        };

        let waker = Waker::from(Arc::new(TaskWaker { id, ready: Arc::clone(&self.ready) }));
        let mut cx = Context::from_waker(&waker);

        match future.as_mut().poll(&mut cx) {
            Poll::Pending => {
                // Suspended; park the future until its wake fires.
                if let Some(entry) = self.tasks.borrow_mut().entries.get_mut(&id) {
                    entry.future = Some(future);
                }
            },
            Poll::Ready(Ok(())) => {
                tracing::debug!(task = id.0, "task completed");
                self.tasks.borrow_mut().entries.remove(&id);
            },
            Poll::Ready(Err(err)) => {
                // Report before the task is dropped; the scheduler and all
                // other tasks keep running.
                tracing::warn!(task = id.0, error = %err, "task failed");
                self.host.print(&format!("task {} failed: {err}", id.0));
                self.tasks.borrow_mut().entries.remove(&id);
            },
        }
    }
}

enum SleepState {
    /// Not yet polled; no timer armed.
    Idle,
    /// Timer armed; the flag flips when it fires.
    Armed(Rc<Cell<bool>>),
}

/// Future returned by [`Scheduler::sleep`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Sleep {
    scheduler: Scheduler,
    duration: Duration,
    state: SleepState,
}

impl Future for Sleep {
    type Output = Result<(), TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &this.state {
            SleepState::Idle => {
                let fired = Rc::new(Cell::new(false));
                let flag = Rc::clone(&fired);
                let waker = cx.waker().clone();
                let scheduler = this.scheduler.clone();

                let armed = this.scheduler.host().hook_timer(
                    this.duration,
                    1,
                    Box::new(move |_remaining| {
                        flag.set(true);
                        waker.wake_by_ref();
                        scheduler.run_ready();
                        HostStatus::Ok
                    }),
                );

                match armed {
                    Ok(_hook) => {
                        this.state = SleepState::Armed(fired);
                        Poll::Pending
                    },
                    Err(err) => Poll::Ready(Err(TaskError::from(err))),
                }
            },
            SleepState::Armed(fired) => {
                // Any waker clone for this task reaches the same ready
                // queue, so a re-poll before the timer fires stays pending
                // without re-registering.
                if fired.get() { Poll::Ready(Ok(())) } else { Poll::Pending }
            },
        }
    }
}
