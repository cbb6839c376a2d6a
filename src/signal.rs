use rustc_hash::FxHashMap;
use std::cell::RefCell;

use crate::sim_if::sim_if;
use crate::trigger::Trigger;
use crate::{SimError, SimpleResult};

thread_local! {
    // full name -> object, filled on first lookup
    static SIG_MAP_NAME: RefCell<FxHashMap<String, SimObject>> = RefCell::new(FxHashMap::default());
}

pub(crate) fn clear_cache() {
    SIG_MAP_NAME.with(|m| m.borrow_mut().clear());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimObject {
    pub(crate) handle: usize,
    pub(crate) kind: ObjectKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Int(u32),
    Real,
    Other,
}

impl SimObject {
    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn name(&self) -> SimpleResult<String> {
        sim_if()?.get_full_name(self.handle)
    }

    pub fn width(&self) -> Option<u32> {
        match self.kind {
            ObjectKind::Int(width) => Some(width),
            _ => None,
        }
    }

    pub fn get_root() -> SimpleResult<Self> {
        let handle = sim_if()?.get_root_handle()?;
        SimObject::from_handle(handle)
    }

    pub fn get_child(&self, name: &str) -> SimpleResult<Self> {
        let mut child_name = self.name()?;
        child_name.push('.');
        child_name.push_str(name);
        SimObject::from_name(&child_name)
    }

    pub fn from_name(full_name: &str) -> SimpleResult<Self> {
        if let Some(obj) = SIG_MAP_NAME.with(|m| m.borrow().get(full_name).copied()) {
            return Ok(obj);
        }
        let handle = sim_if()?.get_handle_by_name(full_name)?;
        let obj = SimObject::from_handle(handle)?;
        SIG_MAP_NAME.with(|m| m.borrow_mut().insert(full_name.to_string(), obj));
        Ok(obj)
    }

    fn from_handle(handle: usize) -> SimpleResult<Self> {
        Ok(SimObject {
            handle,
            kind: sim_if()?.get_kind(handle),
        })
    }

    pub fn i32(&self) -> SimpleResult<i32> {
        sim_if()?.get_value_i32(self)
    }

    pub fn u32(&self) -> SimpleResult<u32> {
        Ok(self.i32()? as u32)
    }

    pub fn bin(&self) -> SimpleResult<String> {
        sim_if()?.get_value_bin(self)
    }

    pub fn set(&self, val: i32) -> SimpleResult<()> {
        match self.kind {
            ObjectKind::Int(width) if width <= 32 => sim_if()?.set_value_i32(self, val),
            kind => Err(SimError::NotWritable {
                name: self.name()?,
                kind,
            }),
        }
    }

    // convenience functions to get edge triggers for this signal
    pub fn rising_edge(self) -> Trigger {
        Trigger::rising_edge(self)
    }
    pub fn falling_edge(self) -> Trigger {
        Trigger::falling_edge(self)
    }
    pub fn edge(self) -> Trigger {
        Trigger::edge(self)
    }
}
