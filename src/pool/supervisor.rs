use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use tracing::{debug, info, warn};

use crate::hooks::{Hooks, LifecycleEvent, WorkerExit};
use crate::pool::context::{MasterIdentity, WorkerContext};
use crate::pool::task::{Task, TaskSource};
use crate::process::{self, UnsupportedError, set_process_title};
use crate::signals::{SignalError, SignalRouter, install_worker_exit_handlers};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_TITLE: &str = "prockit-worker";

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("no task bound to the pool")]
    InvalidTask,

    #[error("task list exhausted before fork")]
    NoTaskAvailable,

    #[error("operation restricted to the master process")]
    NotMaster,

    #[error("fork failed: {0}")]
    Fork(nix::Error),

    #[error(transparent)]
    Signals(#[from] SignalError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),
}

/// Slot record for a live worker. Spawn order only; nothing else persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSlot {
    pub order: usize,
}

/// One observed child exit, consumed exactly once by the reaping logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitObservation {
    pub pid: i32,
    pub status: WorkerExit,
}

/// Forks a bounded or unbounded number of workers from a master, tracks their
/// pids, reaps exits, and enforces a maximum concurrently-live count.
///
/// Admission control is a gate, not a scheduler: no priority, no fairness
/// beyond pop order, no backoff when forking fails.
pub struct WorkerPool {
    tasks: Option<TaskSource>,
    total: u32,
    max: u32,
    spawned: u32,
    title: String,
    kill_signal: Signal,
    poll_interval: Duration,
    hooks: Hooks,
    router: Option<SignalRouter>,
    workers: BTreeMap<i32, WorkerSlot>,
    master: MasterIdentity,
}

impl WorkerPool {
    pub fn new() -> Result<Self, UnsupportedError> {
        process::ensure_supported()?;
        Ok(Self {
            tasks: None,
            total: 1,
            max: 0,
            spawned: 0,
            title: DEFAULT_TITLE.to_string(),
            kill_signal: Signal::SIGUSR1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            hooks: Hooks::new(),
            router: None,
            workers: BTreeMap::new(),
            master: MasterIdentity::capture(),
        })
    }

    /// Number of workers to fork in total; 0 means fork forever.
    pub fn total(mut self, total: u32) -> Self {
        self.total = total;
        self
    }

    /// Maximum concurrently-live workers; 0 means unlimited.
    pub fn max(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    /// Cosmetic process title for forked workers.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Signal `kill_all` broadcasts to workers (default SIGUSR1).
    pub fn kill_signal(mut self, signal: Signal) -> Self {
        self.kill_signal = signal;
        self
    }

    /// Fixed sleep used by the admission gate and the drain loop.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn master(&self) -> MasterIdentity {
        self.master
    }

    /// Live (spawned and not yet reaped) worker count.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Total forks issued so far.
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Bind one task, replicated across every fork.
    pub fn bind_task(&mut self, task: Task) {
        self.tasks = Some(TaskSource::Replicated(task));
    }

    /// Bind a list of tasks, consumed one per fork in order. Sets `total` to
    /// the list length. An empty list is a misconfiguration, rejected before
    /// any fork is attempted.
    pub fn bind_tasks(&mut self, tasks: Vec<Task>) -> Result<(), PoolError> {
        if tasks.is_empty() {
            return Err(PoolError::InvalidTask);
        }
        self.total = tasks.len() as u32;
        self.tasks = Some(TaskSource::Queue(tasks.into()));
        Ok(())
    }

    /// The master loop: spawn phase under the admission gate, then drain
    /// until every worker has been reaped. Returns normally after a full
    /// drain; a stop signal diverts through [`WorkerPool::stop`] instead and
    /// never comes back.
    pub fn run(&mut self) -> Result<(), PoolError> {
        if self.tasks.is_none() {
            return Err(PoolError::InvalidTask);
        }
        self.router = Some(SignalRouter::install(&[
            Signal::SIGCHLD,
            Signal::SIGUSR1,
            Signal::SIGINT,
            Signal::SIGTERM,
        ])?);
        info!(total = self.total, max = self.max, "worker pool starting");

        while self.total == 0 || self.spawned < self.total {
            self.admit();
            self.dispatch_signals();
            self.fork_one()?;
        }

        while !self.workers.is_empty() {
            self.dispatch_signals();
            if self.reap_one().is_none() {
                thread::sleep(self.poll_interval);
            }
        }
        info!(spawned = self.spawned, "worker pool drained");
        Ok(())
    }

    /// Emit `worker_forking`, pop the next task and fork once. The child
    /// builds a fresh context (no inherited bookkeeping), re-arms its signal
    /// dispositions, runs the task and exits 0. The parent registers the new
    /// pid. Fork refusal emits `worker_forked_fail` and surfaces the error.
    pub fn fork_one(&mut self) -> Result<(), PoolError> {
        self.hooks.trigger(&LifecycleEvent::worker_forking());
        let task = self
            .tasks
            .as_mut()
            .and_then(TaskSource::pop)
            .ok_or(PoolError::NoTaskAvailable)?;

        // SAFETY: the master is single-threaded; the child immediately
        // replaces inherited signal state and tracking state before running
        // the task.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let ctx = WorkerContext::for_worker(self.master);
                if let Some(router) = &self.router {
                    router.clear_pending();
                }
                let _ = install_worker_exit_handlers();
                set_process_title(&self.title);
                task(&ctx);
                std::process::exit(0);
            }
            Ok(ForkResult::Parent { child }) => {
                set_process_title(&format!("{} master", self.title));
                self.workers.insert(
                    child.as_raw(),
                    WorkerSlot {
                        order: self.spawned as usize,
                    },
                );
                self.spawned += 1;
                self.hooks
                    .trigger(&LifecycleEvent::worker_forked(child.as_raw()));
                Ok(())
            }
            Err(err) => {
                self.hooks.trigger(&LifecycleEvent::worker_forked_fail());
                Err(PoolError::Fork(err))
            }
        }
    }

    /// Broadcast the kill signal to every tracked worker (defensively
    /// skipping the master's own pid), then block until each is reaped in
    /// turn. No escalation: an unresponsive worker hangs the barrier.
    pub fn kill_all(&mut self) -> Result<(), PoolError> {
        if !self.master.is_current() {
            return Err(PoolError::NotMaster);
        }
        let pids: Vec<i32> = self.workers.keys().copied().collect();
        for pid in pids {
            if pid as u32 == self.master.pid() {
                continue;
            }
            if let Err(err) = kill(Pid::from_raw(pid), self.kill_signal) {
                debug!(pid = pid, error = %err, "signal send failed");
            }
            match waitpid(Pid::from_raw(pid), None) {
                Ok(_) | Err(Errno::ECHILD) => {}
                Err(err) => warn!(pid = pid, error = %err, "waitpid failed"),
            }
            self.workers.remove(&pid);
        }
        Ok(())
    }

    /// Terminal stop path, reached from signal dispatch. Emits
    /// `worker_stopped`, tears the pool down in the master, and exits the
    /// current process with status 1 regardless of role.
    pub fn stop(&mut self) -> ! {
        self.hooks
            .trigger(&LifecycleEvent::worker_stopped(std::process::id()));
        if self.master.is_current() {
            if let Err(err) = self.kill_all() {
                warn!(error = %err, "kill_all failed during stop");
            }
        }
        std::process::exit(1);
    }

    /// Admission gate: busy-poll with a fixed sleep while the live count sits
    /// at the cap, reaping one finished worker before admitting the next
    /// fork.
    fn admit(&mut self) {
        if self.max == 0 {
            return;
        }
        while self.workers.len() >= self.max as usize {
            self.dispatch_signals();
            if self.reap_one().is_none() {
                thread::sleep(self.poll_interval);
            }
        }
    }

    /// Drain pending signal flags on the main control flow. SIGCHLD reaps at
    /// most one exited child per observed delivery; any stop signal diverts
    /// into `stop`.
    fn dispatch_signals(&mut self) {
        let pending = match &self.router {
            Some(router) => router.drain(),
            None => return,
        };
        for signal in pending {
            match signal {
                Signal::SIGCHLD => {
                    let _ = self.reap_one();
                }
                Signal::SIGUSR1 | Signal::SIGINT | Signal::SIGTERM => self.stop(),
                _ => {}
            }
        }
    }

    /// Non-blocking reap of any exited child. Returns the observation when a
    /// tracked worker was collected.
    fn reap_one(&mut self) -> Option<ExitObservation> {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => self.observe_exit(pid.as_raw(), WorkerExit::Code(code)),
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                self.observe_exit(pid.as_raw(), WorkerExit::Signal(signal as i32))
            }
            Ok(_) => None,
            Err(Errno::ECHILD) => None,
            Err(err) => {
                debug!(error = %err, "waitpid failed");
                None
            }
        }
    }

    fn observe_exit(&mut self, pid: i32, status: WorkerExit) -> Option<ExitObservation> {
        // A pid we never spawned is not ours to announce.
        self.workers.remove(&pid)?;
        self.hooks
            .trigger(&LifecycleEvent::worker_finished(pid, status));
        Some(ExitObservation { pid, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn noop_task() -> Task {
        Arc::new(|_ctx| {})
    }

    #[test]
    fn defaults_match_documented_limits() {
        let pool = WorkerPool::new().unwrap();
        assert_eq!(pool.total, 1);
        assert_eq!(pool.max, 0);
        assert_eq!(pool.kill_signal, Signal::SIGUSR1);
        assert_eq!(pool.worker_count(), 0);
        assert_eq!(pool.spawned(), 0);
        assert!(pool.master().is_current());
    }

    #[test]
    fn bind_tasks_rejects_empty_list() {
        let mut pool = WorkerPool::new().unwrap();
        assert!(matches!(
            pool.bind_tasks(Vec::new()),
            Err(PoolError::InvalidTask)
        ));
        assert_eq!(pool.spawned(), 0);
    }

    #[test]
    fn bind_tasks_sets_total_to_list_length() {
        let mut pool = WorkerPool::new().unwrap().total(99);
        pool.bind_tasks(vec![noop_task(), noop_task(), noop_task()])
            .unwrap();
        assert_eq!(pool.total, 3);
    }

    #[test]
    fn run_without_bound_task_is_invalid() {
        let mut pool = WorkerPool::new().unwrap();
        assert!(matches!(pool.run(), Err(PoolError::InvalidTask)));
    }

    #[test]
    fn kill_all_in_master_with_no_workers_is_ok() {
        let mut pool = WorkerPool::new().unwrap();
        pool.kill_all().unwrap();
    }
}
