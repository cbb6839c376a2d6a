use num_format::{Locale, ToFormattedString};
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::rc::Rc;

use crate::config::Config;
use crate::signal::{ObjectKind, SimObject};
use crate::sim_if::{self, SimCallback, SimIf, TimeUnit};
use crate::test::RstbTests;
use crate::trigger::{self, EdgeKind};
use crate::vpi_user;
use crate::{logging, regression, SimError, SimpleResult};

pub(crate) struct Vpi {
    precision: OnceCell<i8>,
}

impl Vpi {
    pub fn new() -> Self {
        Vpi {
            precision: OnceCell::new(),
        }
    }

    fn register(
        &self,
        reason: i32,
        mut time: vpi_user::t_vpi_time,
        mut value: vpi_user::t_vpi_value,
        obj: vpi_user::vpiHandle,
        cb_fun: vpi_user::cb_routine,
    ) -> SimpleResult<usize> {
        let mut cb_data = vpi_user::t_cb_data {
            reason,
            cb_rtn: Some(cb_fun),
            obj,
            value: &mut value,
            time: &mut time,
            ..Default::default()
        };
        let hdl = unsafe { vpi_user::vpi_register_cb(&mut cb_data) };
        check_null(hdl)
            .map(|h| h as usize)
            .map_err(|_| SimError::Callback(format!("reason {}", reason)))
    }

    fn name_of(&self, obj: &SimObject) -> String {
        self.get_full_name(obj.handle())
            .unwrap_or_else(|_| format!("handle {:#x}", obj.handle()))
    }
}

impl SimIf for Vpi {
    fn set_value_i32(&self, obj: &SimObject, value: i32) -> SimpleResult<()> {
        let mut val = vpi_user::t_vpi_value {
            format: vpi_user::vpiIntVal,
            value: vpi_user::t_vpi_value_value { integer: value },
        };
        let mut time = vpi_user::t_vpi_time {
            type_: vpi_user::vpiSimTime,
            ..Default::default()
        };
        unsafe {
            vpi_user::vpi_put_value(
                obj.handle() as vpi_user::vpiHandle,
                &mut val,
                &mut time,
                vpi_user::vpiInertialDelay,
            );
        }
        Ok(())
    }

    fn get_value_i32(&self, obj: &SimObject) -> SimpleResult<i32> {
        let mut val = vpi_user::t_vpi_value {
            format: vpi_user::vpiIntVal,
            value: vpi_user::t_vpi_value_value { integer: 0 },
        };
        unsafe { vpi_user::vpi_get_value(obj.handle() as vpi_user::vpiHandle, &mut val) };
        if val.format == vpi_user::vpiIntVal {
            Ok(unsafe { val.value.integer })
        } else {
            Err(SimError::Read(self.name_of(obj)))
        }
    }

    fn get_value_bin(&self, obj: &SimObject) -> SimpleResult<String> {
        let mut val = vpi_user::t_vpi_value {
            format: vpi_user::vpiBinStrVal,
            value: vpi_user::t_vpi_value_value { integer: 0 },
        };
        unsafe { vpi_user::vpi_get_value(obj.handle() as vpi_user::vpiHandle, &mut val) };
        if val.format != vpi_user::vpiBinStrVal {
            return Err(SimError::Read(self.name_of(obj)));
        }
        let ptr = check_null(unsafe { val.value.str_ }).map_err(|_| SimError::Read(self.name_of(obj)))?;
        Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    fn get_handle_by_name(&self, name: &str) -> SimpleResult<usize> {
        let c_name = CString::new(name).map_err(|_| SimError::NotFound(name.to_string()))?;
        let hdl = unsafe {
            vpi_user::vpi_handle_by_name(c_name.as_ptr() as *mut _, std::ptr::null_mut())
        };
        check_null(hdl)
            .map(|h| h as usize)
            .map_err(|_| SimError::NotFound(name.to_string()))
    }

    fn get_root_handle(&self) -> SimpleResult<usize> {
        let not_found = || SimError::NotFound("top level module".to_string());
        let iterator = unsafe { vpi_user::vpi_iterate(vpi_user::vpiModule, std::ptr::null_mut()) };
        let iterator = check_null(iterator).map_err(|_| not_found())?;
        let root = check_null(unsafe { vpi_user::vpi_scan(iterator) }).map_err(|_| not_found())?;
        // the iterator frees itself once exhausted
        if !unsafe { vpi_user::vpi_scan(iterator) }.is_null() {
            unsafe { vpi_user::vpi_free_object(iterator) };
        }
        Ok(root as usize)
    }

    fn get_full_name(&self, handle: usize) -> SimpleResult<String> {
        let ptr = unsafe { vpi_user::vpi_get_str(vpi_user::vpiFullName, handle as vpi_user::vpiHandle) };
        let ptr = check_null(ptr).map_err(|_| SimError::NotFound(format!("handle {:#x}", handle)))?;
        Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    fn get_kind(&self, handle: usize) -> ObjectKind {
        let hdl = handle as vpi_user::vpiHandle;
        match unsafe { vpi_user::vpi_get(vpi_user::vpiType, hdl) } {
            vpi_user::vpiRealVar | vpi_user::vpiShortRealVar => ObjectKind::Real,
            vpi_user::vpiNet
            | vpi_user::vpiLogicVar
            | vpi_user::vpiIntegerVar
            | vpi_user::vpiBitVar
            | vpi_user::vpiLongIntVar
            | vpi_user::vpiIntVar => {
                ObjectKind::Int(unsafe { vpi_user::vpi_get(vpi_user::vpiSize, hdl) }.max(0) as u32)
            }
            _ => ObjectKind::Other,
        }
    }

    fn get_sim_time_steps(&self) -> u64 {
        let mut time_obj = vpi_user::t_vpi_time {
            type_: vpi_user::vpiSimTime,
            ..Default::default()
        };
        unsafe { vpi_user::vpi_get_time(std::ptr::null_mut(), &mut time_obj) };
        (u64::from(time_obj.high) << 32) + u64::from(time_obj.low)
    }

    fn get_sim_precision(&self) -> i8 {
        *self.precision.get_or_init(get_time_precision)
    }

    fn log(&self, msg: &str) {
        let t = self.get_sim_time(TimeUnit::Ns);
        let int = t.floor() as u64;
        let mut frac_str = format!("{:.3}", t % 1.0);
        frac_str.remove(0);
        let line = format!("{}{}ns {}\n", int.to_formatted_string(&Locale::en), frac_str, msg);
        if let Ok(line) = CString::new(line) {
            unsafe { vpi_user::vpi_printf(b"%s\0".as_ptr() as *mut _, line.as_ptr()) };
        }
    }

    fn register_callback(&self, cb: SimCallback) -> SimpleResult<usize> {
        match cb {
            SimCallback::Time(t) => {
                let time = vpi_user::t_vpi_time {
                    type_: vpi_user::vpiSimTime,
                    high: (t >> 32) as u32,
                    low: (t & 0xFFFF_FFFF) as u32,
                    ..Default::default()
                };
                self.register(
                    vpi_user::cbAfterDelay,
                    time,
                    vpi_user::t_vpi_value::default(),
                    std::ptr::null_mut(),
                    react_vpi_time,
                )
            }
            SimCallback::Edge(sig_hdl) => {
                let value = vpi_user::t_vpi_value {
                    format: vpi_user::vpiIntVal,
                    ..Default::default()
                };
                self.register(
                    vpi_user::cbValueChange,
                    vpi_user::t_vpi_time::default(),
                    value,
                    sig_hdl as vpi_user::vpiHandle,
                    react_vpi_edge,
                )
            }
        }
    }

    fn cancel_callback(&self, cb_hdl: usize) -> SimpleResult<()> {
        match unsafe { vpi_user::vpi_remove_cb(cb_hdl as vpi_user::vpiHandle) } {
            1 => Ok(()),
            _ => Err(SimError::Callback(format!("removal of {:#x}", cb_hdl))),
        }
    }
}

unsafe extern "C" fn react_vpi_edge(cb_data: *mut vpi_user::t_cb_data) -> vpi_user::PLI_INT32 {
    let hdl = (*cb_data).obj as usize;
    let mut edge = EdgeKind::Any;
    let is_bit = vpi_user::vpi_get(vpi_user::vpiSize, (*cb_data).obj) == 1;
    if is_bit && !(*cb_data).value.is_null() {
        edge = match (*(*cb_data).value).value.integer {
            0 => EdgeKind::Falling,
            _ => EdgeKind::Rising,
        };
    }
    trigger::react(SimCallback::Edge(hdl), edge);
    0
}

unsafe extern "C" fn react_vpi_time(cb_data: *mut vpi_user::t_cb_data) -> vpi_user::PLI_INT32 {
    let time = &*(*cb_data).time;
    let t = (u64::from(time.high) << 32) + u64::from(time.low);
    trigger::react(SimCallback::Time(t), EdgeKind::Any);
    0
}

fn get_time_precision() -> i8 {
    let precision = unsafe { vpi_user::vpi_get(vpi_user::vpiTimePrecision, std::ptr::null_mut()) };
    precision.clamp(-15, 2) as i8
}

fn check_null<T>(ptr: *mut T) -> Result<*mut T, ()> {
    if ptr.is_null() {
        Err(())
    } else {
        Ok(ptr)
    }
}

/*
 *  VPI entry
 */

thread_local! {
    static PENDING_TESTS: RefCell<Option<RstbTests>> = RefCell::new(None);
}

#[macro_export]
macro_rules! run_with_vpi {
    ($( $i:ident ),+) => {
        #[allow(non_upper_case_globals)]
        #[no_mangle]
        pub static vlog_startup_routines: [Option<extern "C" fn()>; 2] =
            [Some(vpi_entry_point), None];

        #[no_mangle]
        pub extern "C" fn vpi_entry_point() {
            let mut tests = $crate::test::RstbTests::new();
            $(tests.push($crate::test::Test::new(stringify!($i), |dut| {
                $crate::prelude::FutureExt::boxed($i(dut))
            }));)+
            $crate::vpi::vpi_init(std::module_path!(), tests);
        }
    };
}

/// Installs the VPI interface and hooks the tests into start and end of simulation.
pub fn vpi_init(suite_name: &str, tests: RstbTests) {
    sim_if::install(Rc::new(Vpi::new()));
    logging::init(Config::from_env().log_level);
    crate::CRATE_NAME.with(|n| n.replace(suite_name.to_string()));
    PENDING_TESTS.with(|p| p.replace(Some(tests)));

    for (reason, cb_rtn) in [
        (vpi_user::cbStartOfSimulation, vpi_start_of_simulation as vpi_user::cb_routine),
        (vpi_user::cbEndOfSimulation, vpi_end_of_simulation as vpi_user::cb_routine),
    ] {
        let mut cb_data = vpi_user::t_cb_data {
            reason,
            cb_rtn: Some(cb_rtn),
            ..Default::default()
        };
        unsafe { vpi_user::vpi_register_cb(&mut cb_data) };
    }
}

unsafe extern "C" fn vpi_start_of_simulation(_: *mut vpi_user::t_cb_data) -> vpi_user::PLI_INT32 {
    let tests = PENDING_TESTS.with(|p| p.borrow_mut().take()).unwrap_or_default();
    if let Err(e) = regression::start_of_simulation(tests) {
        log::error!("Could not start tests: {}", e);
    }
    0
}

unsafe extern "C" fn vpi_end_of_simulation(_: *mut vpi_user::t_cb_data) -> vpi_user::PLI_INT32 {
    regression::end_of_simulation(&Config::from_env());
    0
}
