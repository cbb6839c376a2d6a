use intmap::IntMap;
use log::warn;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::executor;
use crate::signal::SimObject;
use crate::sim_if::{sim_if, SimCallback, TimeUnit};
use crate::SimpleResult;

// IntMap specializes on u64 keys and doesn't need to hash at all
struct TriggerState {
    // key is signal handle
    edges: IntMap<CallbackHandles>,
    // key is absolute callback time
    timers: IntMap<CallbackHandles>,
}

thread_local! {
    static TRIGGERS: RefCell<TriggerState> = RefCell::new(TriggerState {
        edges: IntMap::new(),
        timers: IntMap::new(),
    });
}

struct CallbackHandles {
    handle: usize,
    callbacks: VecDeque<TrigShared>,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum EdgeKind {
    Any,
    Rising,
    Falling,
}

#[derive(Debug, Clone)]
struct TrigShared {
    waker: Waker,
    // Edge callbacks are shared per signal, so each waiter remembers which polarity it wants.
    edge_kind: EdgeKind,
}

/// Drops all waiting triggers without notifying the simulator.
pub(crate) fn clear_triggers() {
    TRIGGERS.with(|t| {
        let mut t = t.borrow_mut();
        t.edges = IntMap::new();
        t.timers = IntMap::new();
    });
}

/// Cancels all pending callbacks. Waiting tasks are never woken.
pub(crate) fn cancel_all_triggers() {
    let handles: Vec<usize> = TRIGGERS.with(|t| {
        let mut t = t.borrow_mut();
        let timers = t.timers.drain().map(|(_, cb)| cb.handle).collect::<Vec<_>>();
        let edges = t.edges.drain().map(|(_, cb)| cb.handle);
        timers.into_iter().chain(edges).collect()
    });
    if let Ok(sim) = sim_if() {
        for handle in handles {
            if let Err(e) = sim.cancel_callback(handle) {
                warn!("{}", e);
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum TrigKind {
    Edge(usize, EdgeKind),
    Timer(u64),
}

/// Future that resolves once the simulator reaches a point in time or a signal changes.
#[derive(Clone, Debug)]
pub struct Trigger {
    kind: TrigKind,
    awaited: bool,
}

impl Trigger {
    pub fn timer(time: u64, unit: &str) -> SimpleResult<Self> {
        let unit: TimeUnit = unit.parse()?;
        Ok(Trigger::timer_steps(sim_if()?.get_sim_steps(time, unit)?))
    }
    pub fn timer_steps(steps: u64) -> Self {
        Trigger::new(TrigKind::Timer(steps))
    }
    pub fn edge(signal: SimObject) -> Self {
        Trigger::new(TrigKind::Edge(signal.handle(), EdgeKind::Any))
    }
    pub fn rising_edge(signal: SimObject) -> Self {
        Trigger::new(TrigKind::Edge(signal.handle(), EdgeKind::Rising))
    }
    pub fn falling_edge(signal: SimObject) -> Self {
        Trigger::new(TrigKind::Edge(signal.handle(), EdgeKind::Falling))
    }
    fn new(kind: TrigKind) -> Self {
        Trigger {
            kind,
            awaited: false,
        }
    }

    fn register(&self, waker: Waker) -> SimpleResult<()> {
        let sim = sim_if()?;
        let (map_key, cb, edge_kind) = match self.kind {
            // the simulator reports absolute time back, not the delay
            TrigKind::Timer(t) => (t + sim.get_sim_time_steps(), SimCallback::Time(t), EdgeKind::Any),
            TrigKind::Edge(sig_hdl, kind) => (sig_hdl as u64, SimCallback::Edge(sig_hdl), kind),
        };
        let shared = TrigShared { waker, edge_kind };
        let pending = TRIGGERS.with(|t| {
            let mut t = t.borrow_mut();
            let map = match cb {
                SimCallback::Time(_) => &mut t.timers,
                SimCallback::Edge(_) => &mut t.edges,
            };
            match map.get_mut(map_key) {
                Some(callbacks) => {
                    callbacks.callbacks.push_back(shared);
                    None
                }
                None => Some(shared),
            }
        });
        if let Some(shared) = pending {
            let handle = sim.register_callback(cb)?;
            let mut callbacks = VecDeque::new();
            callbacks.push_back(shared);
            TRIGGERS.with(|t| {
                let mut t = t.borrow_mut();
                let map = match cb {
                    SimCallback::Time(_) => &mut t.timers,
                    SimCallback::Edge(_) => &mut t.edges,
                };
                map.insert(map_key, CallbackHandles { handle, callbacks });
            });
        }
        Ok(())
    }
}

impl Future for Trigger {
    type Output = SimpleResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A trigger is registered exactly once, so a second poll means its callback woke us.
        if self.awaited {
            return Poll::Ready(Ok(()));
        }
        self.awaited = true;
        match self.register(cx.waker().clone()) {
            Ok(()) => Poll::Pending,
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

/// Entry point for simulator callbacks: wakes the waiting tasks and runs them.
#[inline]
pub fn react(cb: SimCallback, edge: EdgeKind) {
    let mut cancel = None;
    let wake: VecDeque<TrigShared> = TRIGGERS.with(|t| {
        let mut t = t.borrow_mut();
        match cb {
            SimCallback::Time(abs) => match t.timers.remove(abs) {
                Some(callbacks) => callbacks.callbacks,
                None => {
                    warn!("Did not expect timer callback: t={}", abs);
                    VecDeque::new()
                }
            },
            SimCallback::Edge(sig_hdl) => {
                let Some(mut callbacks) = t.edges.remove(sig_hdl as u64) else {
                    warn!("Did not expect edge callback: sig_hdl={}", sig_hdl);
                    return VecDeque::new();
                };
                let (woken, rescheduled): (VecDeque<_>, VecDeque<_>) = callbacks
                    .callbacks
                    .drain(..)
                    .partition(|trig| matches_edge(trig.edge_kind, edge));
                if rescheduled.is_empty() {
                    // nobody is left waiting on this signal
                    cancel = Some(callbacks.handle);
                } else {
                    callbacks.callbacks = rescheduled;
                    t.edges.insert(sig_hdl as u64, callbacks);
                }
                woken
            }
        }
    });

    if let Some(handle) = cancel {
        if let Err(e) = sim_if().and_then(|sim| sim.cancel_callback(handle)) {
            warn!("{}", e);
        }
    }
    if !wake.is_empty() {
        for shared in wake {
            shared.waker.wake();
        }
        executor::run_once();
    }
}

fn matches_edge(wanted: EdgeKind, seen: EdgeKind) -> bool {
    wanted == EdgeKind::Any || seen == EdgeKind::Any || wanted == seen
}
