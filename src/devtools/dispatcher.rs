//! Execution of inbound replays on the host's terms.

pub type Task = Box<dyn FnOnce() + Send>;

/// Runs replay writes. Hosts wrap them here, for instance to schedule a
/// redraw afterwards.
pub trait Dispatcher: Send + Sync {
    fn run(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

impl Dispatcher for DirectDispatcher {
    fn run(&self, task: Task) {
        task();
    }
}

impl<F> Dispatcher for F
where
    F: Fn(Task) + Send + Sync,
{
    fn run(&self, task: Task) {
        self(task)
    }
}
