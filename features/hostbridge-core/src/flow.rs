//! Call-context local cells.
//!
//! A [FlowingCell] holds one value per logical call context. Synchronous code sees a
//! thread-local slot; inside a frame opened with [FlowingCell::flow] the value lives in a
//! `tokio` task-local instead, so it follows the future across threads and awaits.
//! A new frame starts with the value of the context that opened it, changes made inside
//! the frame never leak out of it.

use std::{cell::RefCell, future::Future, marker::PhantomData};

use tokio::task::futures::TaskLocalFuture;

pub type TaskSlot<T> = tokio::task::LocalKey<RefCell<Option<T>>>;
pub type ThreadSlot<T> = std::thread::LocalKey<RefCell<Option<T>>>;

pub struct FlowingCell<T: Clone + 'static> {
    task: &'static TaskSlot<T>,
    thread: &'static ThreadSlot<T>,
}

impl<T: Clone + 'static> FlowingCell<T> {
    pub const fn new(task: &'static TaskSlot<T>, thread: &'static ThreadSlot<T>) -> Self {
        FlowingCell { task, thread }
    }

    /// Current value of the calling context
    pub fn get(&self) -> Option<T> {
        match self.task.try_with(|cell| cell.borrow().clone()) {
            Ok(value) => value,
            Err(_) => self
                .thread
                .try_with(|cell| cell.borrow().clone())
                .unwrap_or(None),
        }
    }

    /// Sets the value of the calling context, returning the previous one
    pub fn replace(&'static self, value: Option<T>) -> Option<T> {
        let mut incoming = Some(value);
        if let Ok(previous) = self
            .task
            .try_with(|cell| cell.replace(incoming.take().flatten()))
        {
            return previous;
        }
        self.thread
            .try_with(|cell| cell.replace(incoming.take().flatten()))
            .unwrap_or(None)
    }

    /// Sets the value until the returned guard is restored or dropped
    pub fn enter(&'static self, value: Option<T>) -> Restore<T> {
        let previous = self.replace(value);
        Restore {
            cell: self,
            previous: RefCell::new(Some(previous)),
            _not_send: PhantomData,
        }
    }

    /// Runs `fut` in a new frame inheriting the current value
    pub fn flow<F: Future>(&'static self, fut: F) -> TaskLocalFuture<RefCell<Option<T>>, F> {
        self.flow_with(self.get(), fut)
    }

    /// Runs `fut` in a new frame starting with `value`
    pub fn flow_with<F: Future>(
        &'static self,
        value: Option<T>,
        fut: F,
    ) -> TaskLocalFuture<RefCell<Option<T>>, F> {
        self.task.scope(RefCell::new(value), fut)
    }
}

/// Puts back the value a [FlowingCell] had before [FlowingCell::enter].
///
/// Restoring happens once: explicitly through [Restore::restore] or on drop.
/// The guard is bound to the thread it was created on.
pub struct Restore<T: Clone + 'static> {
    cell: &'static FlowingCell<T>,
    previous: RefCell<Option<Option<T>>>,
    _not_send: PhantomData<*const ()>,
}

impl<T: Clone + 'static> Restore<T> {
    pub fn restore(&self) {
        if let Some(previous) = self.previous.borrow_mut().take() {
            self.cell.replace(previous);
        }
    }

    pub fn is_restored(&self) -> bool {
        self.previous.borrow().is_none()
    }
}

impl<T: Clone + 'static> Drop for Restore<T> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    tokio::task_local! {
        static TASK: RefCell<Option<u32>>;
    }
    thread_local! {
        static THREAD: RefCell<Option<u32>> = const { RefCell::new(None) };
    }
    static CELL: FlowingCell<u32> = FlowingCell::new(&TASK, &THREAD);

    #[test]
    fn enter_restores_in_stack_order() {
        assert_eq!(CELL.get(), None);
        let outer = CELL.enter(Some(1));
        {
            let inner = CELL.enter(Some(2));
            assert_eq!(CELL.get(), Some(2));
            inner.restore();
            inner.restore();
            assert_eq!(CELL.get(), Some(1));
        }
        assert_eq!(CELL.get(), Some(1));
        drop(outer);
        assert_eq!(CELL.get(), None);
    }

    #[tokio::test]
    async fn frames_inherit_but_never_leak() {
        let _outer = CELL.enter(Some(7));

        let seen = CELL
            .flow(async {
                let inherited = CELL.get();
                CELL.replace(Some(8));
                tokio::task::yield_now().await;
                (inherited, CELL.get())
            })
            .await;

        assert_eq!(seen, (Some(7), Some(8)));
        assert_eq!(CELL.get(), Some(7));
    }
}
