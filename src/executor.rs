use futures::{
    future::{BoxFuture, FutureExt},
    task::{waker_ref, ArcWake, Context, Poll},
};
use futures_channel::oneshot;
use queues::{IsQueue, Queue};
use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::value::Val;
use crate::RstbResult;

thread_local! {
    static READY_QUEUE: RefCell<Queue<Arc<Task>>> = RefCell::new(Queue::new());
}

pub fn schedule_task(task: Arc<Task>) {
    READY_QUEUE.with(|q| {
        let _ = q.borrow_mut().add(task);
    });
}

fn next_task() -> Option<Arc<Task>> {
    READY_QUEUE.with(|q| q.borrow_mut().remove().ok())
}

pub(crate) fn clear_ready_queue() {
    READY_QUEUE.with(|q| q.replace(Queue::new()));
}

/// Polls ready tasks until none are left.
#[inline]
pub fn run_once() {
    while let Some(task) = next_task() {
        process_task(task);
    }
}

#[inline]
fn process_task(task: Arc<Task>) {
    if task.is_cancelled() {
        // dropped once all references disappear
        return;
    }

    let mut fut_slot = lock(&task.future);
    // a finished task can still be woken by a stale waker
    let Some(mut fut) = fut_slot.take() else {
        return;
    };
    let waker = waker_ref(&task);
    let context = &mut Context::from_waker(&*waker);
    match fut.as_mut().poll(context) {
        Poll::Pending => {
            if !task.is_cancelled() {
                *fut_slot = Some(fut);
            }
        }
        Poll::Ready(result) => {
            drop(fut_slot);
            task.finish(result);
        }
    }
}

// Tasks only ever run on the simulator thread, a poisoned lock carries no broken invariant.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum TaskState {
    Pending,
    Cancelled,
}

pub struct Task {
    future: Mutex<Option<BoxFuture<'static, RstbResult>>>,
    state: Mutex<TaskState>,
    name: String,
    join_tx: Mutex<Option<oneshot::Sender<RstbResult>>>,
}

impl Task {
    /// Runs `future` concurrently to the caller. The handle may be dropped.
    pub fn fork(future: impl Future<Output = RstbResult> + Send + 'static) -> JoinHandle {
        Task::spawn_from_future(future, "forked")
    }

    pub fn spawn_from_future(
        future: impl Future<Output = RstbResult> + Send + 'static,
        name: &str,
    ) -> JoinHandle {
        let (task, join_handle) = Task::new(future.boxed(), name);
        schedule_task(task);
        join_handle
    }

    fn new(fut: BoxFuture<'static, RstbResult>, name: &str) -> (Arc<Self>, JoinHandle) {
        let (tx, rx) = oneshot::channel::<RstbResult>();
        let task = Arc::new(Self {
            future: Mutex::new(Some(fut)),
            state: Mutex::new(TaskState::Pending),
            name: name.to_string(),
            join_tx: Mutex::new(Some(tx)),
        });
        let join_handle = JoinHandle {
            awaited_task: Some(task.clone()),
            join_rx: rx,
        };
        (task, join_handle)
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.state) == TaskState::Cancelled
    }

    /// Stops the task. Whoever awaits it receives an error.
    pub fn cancel(&self) {
        *lock(&self.state) = TaskState::Cancelled;
        // the future is busy if the task cancels itself; process_task drops it afterwards
        if let Ok(mut slot) = self.future.try_lock() {
            slot.take();
        }
        self.finish(Err(Val::String(format!("Task '{}' cancelled", self.name))));
    }

    fn finish(&self, result: RstbResult) {
        if let Some(tx) = lock(&self.join_tx).take() {
            let _ = tx.send(result);
        }
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        schedule_task(arc_self.clone());
    }
}

pub struct JoinHandle {
    awaited_task: Option<Arc<Task>>,
    join_rx: oneshot::Receiver<RstbResult>,
}

impl JoinHandle {
    pub fn get_task(&self) -> Option<&Arc<Task>> {
        self.awaited_task.as_ref()
    }
}

impl Future for JoinHandle {
    type Output = RstbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Val::String("Awaited task was dropped".to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn join_handle_yields_task_result() {
        clear_ready_queue();
        let result = Arc::new(Mutex::new(None));
        let slot = result.clone();
        Task::spawn_from_future(
            async move {
                let inner = Task::fork(async { Ok(Val::Int(7)) });
                *slot.lock().unwrap() = Some(inner.await);
                Ok(Val::None)
            },
            "outer",
        );
        run_once();
        assert_eq!(*result.lock().unwrap(), Some(Ok(Val::Int(7))));
    }

    #[test]
    fn forked_tasks_run_after_the_forking_task_yields() {
        clear_ready_queue();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = order.clone();
        Task::spawn_from_future(
            async move {
                let o2 = o.clone();
                let child = Task::fork(async move {
                    o2.lock().unwrap().push("child");
                    Ok(Val::None)
                });
                o.lock().unwrap().push("parent");
                let _ = child.await;
                o.lock().unwrap().push("parent done");
                Ok(Val::None)
            },
            "parent",
        );
        run_once();
        assert_eq!(*order.lock().unwrap(), vec!["parent", "child", "parent done"]);
    }

    #[test]
    fn cancelled_task_never_runs_and_reports_error() {
        clear_ready_queue();
        let runs = Arc::new(AtomicU32::new(0));
        let r = runs.clone();
        let handle = Task::fork(async move {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(Val::None)
        });
        let task = handle.get_task().unwrap().clone();
        task.cancel();
        assert!(task.is_cancelled());
        run_once();
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let result = Arc::new(Mutex::new(None));
        let slot = result.clone();
        Task::fork(async move {
            *slot.lock().unwrap() = Some(handle.await);
            Ok(Val::None)
        });
        run_once();
        assert!(matches!(*result.lock().unwrap(), Some(Err(_))));
    }
}
