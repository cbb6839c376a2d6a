//! Scripted simulator backend for unit tests.
//!
//! Writes apply immediately and queue a value-change event for 1-bit signals.
//! `run` delivers queued value changes first, then fires the earliest timer,
//! until nothing is left to do. There is no design behind the signals: outputs
//! keep whatever was last written or poked.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::signal::{ObjectKind, SimObject};
use crate::sim_if::{self, SimCallback, SimIf};
use crate::trigger::{self, EdgeKind};
use crate::{SimError, SimpleResult};

const ROOT_HANDLE: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MockWrite {
    pub time: u64,
    pub name: String,
    pub value: i32,
}

struct MockSignal {
    name: String,
    width: u32,
    value: u64,
}

struct MockState {
    time: u64,
    signals: Vec<MockSignal>,
    // callback handle -> callback, timers stored with absolute time
    callbacks: BTreeMap<usize, SimCallback>,
    next_cb: usize,
    value_changes: VecDeque<(usize, EdgeKind)>,
    writes: Vec<MockWrite>,
    // (sim time, line)
    log: Vec<(u64, String)>,
}

pub(crate) struct MockSim {
    top: String,
    state: RefCell<MockState>,
}

impl MockSim {
    /// Installs a backend with a top module `top` holding `(name, width)` signals.
    pub fn install(top: &str, signals: &[(&str, u32)]) -> Rc<MockSim> {
        let sim = Rc::new(MockSim {
            top: top.to_string(),
            state: RefCell::new(MockState {
                time: 0,
                signals: signals
                    .iter()
                    .map(|(name, width)| MockSignal {
                        name: format!("{}.{}", top, name),
                        width: *width,
                        value: 0,
                    })
                    .collect(),
                callbacks: BTreeMap::new(),
                next_cb: 1,
                value_changes: VecDeque::new(),
                writes: Vec::new(),
                log: Vec::new(),
            }),
        });
        sim_if::install(sim.clone());
        sim
    }

    /// Sets a signal without recording a write, like the design driving it.
    pub fn poke(&self, name: &str, value: u64) {
        let mut s = self.state.borrow_mut();
        if let Some(sig) = s.signals.iter_mut().find(|sig| sig.name == name) {
            sig.value = value & mask(sig.width);
        }
    }

    pub fn time(&self) -> u64 {
        self.state.borrow().time
    }

    pub fn writes(&self) -> Vec<MockWrite> {
        self.state.borrow().writes.clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.state.borrow().log.iter().map(|(_, line)| line.clone()).collect()
    }

    /// Log lines together with the simulation time they were written at.
    pub fn log_entries(&self) -> Vec<(u64, String)> {
        self.state.borrow().log.clone()
    }

    pub fn pending_callbacks(&self) -> usize {
        self.state.borrow().callbacks.len()
    }

    pub fn run(&self) {
        self.run_until(u64::MAX);
    }

    /// Delivers events until none are left or the next timer lies beyond `limit`.
    pub fn run_until(&self, limit: u64) {
        while let Some((cb, edge)) = self.next_event(limit) {
            trigger::react(cb, edge);
        }
    }

    fn next_event(&self, limit: u64) -> Option<(SimCallback, EdgeKind)> {
        let mut s = self.state.borrow_mut();
        while let Some((hdl, edge)) = s.value_changes.pop_front() {
            let watched = s
                .callbacks
                .values()
                .any(|cb| *cb == SimCallback::Edge(hdl));
            if watched {
                return Some((SimCallback::Edge(hdl), edge));
            }
        }
        let (cb_hdl, abs) = s
            .callbacks
            .iter()
            .filter_map(|(hdl, cb)| match cb {
                SimCallback::Time(abs) => Some((*hdl, *abs)),
                SimCallback::Edge(_) => None,
            })
            .min_by_key(|(hdl, abs)| (*abs, *hdl))?;
        if abs > limit {
            return None;
        }
        s.callbacks.remove(&cb_hdl);
        s.time = abs;
        Some((SimCallback::Time(abs), EdgeKind::Any))
    }

    fn signal_index(&self, handle: usize) -> SimpleResult<usize> {
        let idx = handle.checked_sub(ROOT_HANDLE + 1);
        match idx {
            Some(idx) if idx < self.state.borrow().signals.len() => Ok(idx),
            _ => Err(SimError::NotFound(format!("handle {}", handle))),
        }
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

impl SimIf for MockSim {
    fn set_value_i32(&self, obj: &SimObject, value: i32) -> SimpleResult<()> {
        let idx = self.signal_index(obj.handle())?;
        let mut s = self.state.borrow_mut();
        let time = s.time;
        let sig = &mut s.signals[idx];
        let old = sig.value;
        sig.value = (value as u32 as u64) & mask(sig.width);
        let new = sig.value;
        let write = MockWrite {
            time,
            name: sig.name.clone(),
            value,
        };
        if old != new {
            let edge = match (sig.width, new) {
                (1, 1) => EdgeKind::Rising,
                (1, _) => EdgeKind::Falling,
                _ => EdgeKind::Any,
            };
            s.value_changes.push_back((obj.handle(), edge));
        }
        s.writes.push(write);
        Ok(())
    }

    fn get_value_i32(&self, obj: &SimObject) -> SimpleResult<i32> {
        let idx = self.signal_index(obj.handle())?;
        Ok(self.state.borrow().signals[idx].value as i32)
    }

    fn get_value_bin(&self, obj: &SimObject) -> SimpleResult<String> {
        let idx = self.signal_index(obj.handle())?;
        let s = self.state.borrow();
        let sig = &s.signals[idx];
        Ok(format!("{:0width$b}", sig.value, width = sig.width as usize))
    }

    fn get_handle_by_name(&self, name: &str) -> SimpleResult<usize> {
        if name == self.top {
            return Ok(ROOT_HANDLE);
        }
        self.state
            .borrow()
            .signals
            .iter()
            .position(|sig| sig.name == name)
            .map(|idx| idx + ROOT_HANDLE + 1)
            .ok_or_else(|| SimError::NotFound(name.to_string()))
    }

    fn get_root_handle(&self) -> SimpleResult<usize> {
        Ok(ROOT_HANDLE)
    }

    fn get_full_name(&self, handle: usize) -> SimpleResult<String> {
        if handle == ROOT_HANDLE {
            return Ok(self.top.clone());
        }
        let idx = self.signal_index(handle)?;
        Ok(self.state.borrow().signals[idx].name.clone())
    }

    fn get_kind(&self, handle: usize) -> ObjectKind {
        match self.signal_index(handle) {
            Ok(idx) => ObjectKind::Int(self.state.borrow().signals[idx].width),
            Err(_) => ObjectKind::Other,
        }
    }

    fn get_sim_time_steps(&self) -> u64 {
        self.state.borrow().time
    }

    fn get_sim_precision(&self) -> i8 {
        -9
    }

    fn log(&self, msg: &str) {
        let mut s = self.state.borrow_mut();
        let time = s.time;
        s.log.push((time, msg.to_string()));
    }

    fn register_callback(&self, cb: SimCallback) -> SimpleResult<usize> {
        let mut s = self.state.borrow_mut();
        let cb = match cb {
            SimCallback::Time(delay) => SimCallback::Time(s.time + delay),
            edge => edge,
        };
        let hdl = s.next_cb;
        s.next_cb += 1;
        s.callbacks.insert(hdl, cb);
        Ok(hdl)
    }

    fn cancel_callback(&self, cb_hdl: usize) -> SimpleResult<()> {
        match self.state.borrow_mut().callbacks.remove(&cb_hdl) {
            Some(_) => Ok(()),
            None => Err(SimError::Callback(format!("handle {} not registered", cb_hdl))),
        }
    }
}
