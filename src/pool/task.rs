use std::collections::VecDeque;
use std::sync::Arc;

use crate::pool::context::WorkerContext;

/// A unit of work run to completion inside a forked worker. The body is
/// opaque to the supervisor; once it returns, the worker exits with status 0.
pub type Task = Arc<dyn Fn(&WorkerContext) + Send + Sync>;

/// Pending work: either one task replicated across every fork, or a list
/// consumed strictly in pop order, one per fork.
pub(crate) enum TaskSource {
    Replicated(Task),
    Queue(VecDeque<Task>),
}

impl TaskSource {
    pub(crate) fn pop(&mut self) -> Option<Task> {
        match self {
            TaskSource::Replicated(task) => Some(Arc::clone(task)),
            TaskSource::Queue(queue) => queue.pop_front(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn marker(slot: Arc<AtomicUsize>, value: usize) -> Task {
        Arc::new(move |_ctx| slot.store(value, Ordering::SeqCst))
    }

    #[test]
    fn replicated_source_never_runs_dry() {
        let slot = Arc::new(AtomicUsize::new(0));
        let mut source = TaskSource::Replicated(marker(Arc::clone(&slot), 7));

        for _ in 0..10 {
            assert!(source.pop().is_some());
        }
    }

    #[test]
    fn queue_source_pops_in_order_then_runs_dry() {
        let slot = Arc::new(AtomicUsize::new(0));
        let ctx = WorkerContext::for_tests();
        let mut source = TaskSource::Queue(
            (1..=3)
                .map(|value| marker(Arc::clone(&slot), value))
                .collect(),
        );

        for expected in 1..=3 {
            let task = source.pop().expect("task available");
            task(&ctx);
            assert_eq!(slot.load(Ordering::SeqCst), expected);
        }
        assert!(source.pop().is_none());
    }
}
