//! Subset of the IEEE 1364 `vpi_user.h` / IEEE 1800 `sv_vpi_user.h` declarations.
//! The symbols are provided by the simulator that loads this library.

use std::os::raw::{c_char, c_void};

pub type PLI_INT32 = i32;
pub type PLI_UINT32 = u32;
pub type PLI_BYTE8 = c_char;
pub type vpiHandle = *mut PLI_UINT32;

// object types
pub const vpiIntegerVar: PLI_INT32 = 25;
pub const vpiModule: PLI_INT32 = 32;
pub const vpiNet: PLI_INT32 = 36;
pub const vpiRealVar: PLI_INT32 = 47;
pub const vpiReg: PLI_INT32 = 48;
pub const vpiLongIntVar: PLI_INT32 = 610;
pub const vpiIntVar: PLI_INT32 = 612;
pub const vpiShortRealVar: PLI_INT32 = 613;
pub const vpiLogicVar: PLI_INT32 = vpiReg;
pub const vpiBitVar: PLI_INT32 = 620;

// properties
pub const vpiType: PLI_INT32 = 1;
pub const vpiName: PLI_INT32 = 2;
pub const vpiFullName: PLI_INT32 = 3;
pub const vpiSize: PLI_INT32 = 4;
pub const vpiTimePrecision: PLI_INT32 = 12;

// value formats
pub const vpiBinStrVal: PLI_INT32 = 1;
pub const vpiIntVal: PLI_INT32 = 6;
pub const vpiSuppressVal: PLI_INT32 = 13;

// delay modes
pub const vpiNoDelay: PLI_INT32 = 1;
pub const vpiInertialDelay: PLI_INT32 = 2;

// time types
pub const vpiSimTime: PLI_INT32 = 2;
pub const vpiSuppressTime: PLI_INT32 = 3;

// callback reasons
pub const cbValueChange: PLI_INT32 = 1;
pub const cbAfterDelay: PLI_INT32 = 9;
pub const cbStartOfSimulation: PLI_INT32 = 11;
pub const cbEndOfSimulation: PLI_INT32 = 12;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct t_vpi_time {
    pub type_: PLI_INT32,
    pub high: PLI_UINT32,
    pub low: PLI_UINT32,
    pub real: f64,
}

impl Default for t_vpi_time {
    fn default() -> Self {
        Self {
            type_: vpiSuppressTime,
            high: 0,
            low: 0,
            real: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union t_vpi_value_value {
    pub str_: *mut PLI_BYTE8,
    pub scalar: PLI_INT32,
    pub integer: PLI_INT32,
    pub real: f64,
    pub time: *mut t_vpi_time,
    pub vector: *mut c_void,
    pub strength: *mut c_void,
    pub misc: *mut PLI_BYTE8,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct t_vpi_value {
    pub format: PLI_INT32,
    pub value: t_vpi_value_value,
}

impl Default for t_vpi_value {
    fn default() -> Self {
        Self {
            format: vpiSuppressVal,
            value: t_vpi_value_value { integer: 0 },
        }
    }
}

pub type cb_routine = unsafe extern "C" fn(*mut t_cb_data) -> PLI_INT32;

#[repr(C)]
pub struct t_cb_data {
    pub reason: PLI_INT32,
    pub cb_rtn: Option<cb_routine>,
    pub obj: vpiHandle,
    pub time: *mut t_vpi_time,
    pub value: *mut t_vpi_value,
    pub index: PLI_INT32,
    pub user_data: *mut PLI_BYTE8,
}

impl Default for t_cb_data {
    fn default() -> Self {
        Self {
            reason: 0,
            cb_rtn: None,
            obj: std::ptr::null_mut(),
            time: std::ptr::null_mut(),
            value: std::ptr::null_mut(),
            index: 0,
            user_data: std::ptr::null_mut(),
        }
    }
}

extern "C" {
    pub fn vpi_register_cb(cb_data_p: *mut t_cb_data) -> vpiHandle;
    pub fn vpi_remove_cb(cb_obj: vpiHandle) -> PLI_INT32;
    pub fn vpi_handle_by_name(name: *mut PLI_BYTE8, scope: vpiHandle) -> vpiHandle;
    pub fn vpi_iterate(type_: PLI_INT32, ref_handle: vpiHandle) -> vpiHandle;
    pub fn vpi_scan(iterator: vpiHandle) -> vpiHandle;
    pub fn vpi_get(property: PLI_INT32, object: vpiHandle) -> PLI_INT32;
    pub fn vpi_get_str(property: PLI_INT32, object: vpiHandle) -> *mut PLI_BYTE8;
    pub fn vpi_get_value(expr: vpiHandle, value_p: *mut t_vpi_value);
    pub fn vpi_put_value(
        object: vpiHandle,
        value_p: *mut t_vpi_value,
        time_p: *mut t_vpi_time,
        flags: PLI_INT32,
    ) -> vpiHandle;
    pub fn vpi_get_time(object: vpiHandle, time_p: *mut t_vpi_time);
    pub fn vpi_free_object(object: vpiHandle) -> PLI_INT32;
    pub fn vpi_printf(format: *mut PLI_BYTE8, ...) -> PLI_INT32;
}
