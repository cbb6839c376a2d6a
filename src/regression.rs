use log::{error, info, warn};
use prettytable::{Cell, Row, Table};
use std::cell::{Cell as StdCell, RefCell};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::executor::{self, Task};
use crate::rstb_obj::RstbObjSafe;
use crate::signal::SimObject;
use crate::sim_if::{sim_if, TimeUnit};
use crate::test::{RstbTests, Test};
use crate::value::Val;
use crate::{junit, trigger, RstbResult, SimpleResult};

thread_local! {
    static TESTS: RefCell<Vec<RstbObjSafe<Test>>> = RefCell::new(Vec::new());
    static CURRENT_TEST: RefCell<Option<(Arc<Task>, RstbObjSafe<Test>)>> = RefCell::new(None);
    // wall clock and sim time (ns) when the current test started
    static TEST_START: StdCell<Option<(Instant, f64)>> = StdCell::new(None);
    static SIM_START: StdCell<Option<Instant>> = StdCell::new(None);
}

/// One finished test, as reported at the end of simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub time_secs: f64,
    pub sim_time_ns: f64,
}

/// Passes the current test, unless it already ended.
pub fn pass_test(msg: &str) {
    end_current_test(Ok(Val::String(msg.to_string())));
}

/// Fails the current test, unless it already ended.
pub fn fail_test(msg: &str) {
    end_current_test(Err(Val::String(msg.to_string())));
}

fn sim_time_ns() -> f64 {
    sim_if().map(|sim| sim.get_sim_time(TimeUnit::Ns)).unwrap_or(0.0)
}

fn end_current_test(result: RstbResult) {
    let Some((task, test)) = CURRENT_TEST.with(|c| c.borrow_mut().take()) else {
        return;
    };
    let (time_secs, sim_time_ns) = match TEST_START.with(|s| s.take()) {
        Some((wall, sim_ns)) => (wall.elapsed().as_secs_f64(), sim_time_ns() - sim_ns),
        None => (0.0, 0.0),
    };
    test.with_mut(|t| {
        match &result {
            Ok(val) => info!("{} passed: {}", t.name, val),
            Err(val) => error!("{} failed: {}", t.name, val),
        }
        t.time_secs = time_secs;
        t.sim_time_ns = sim_time_ns;
        t.set_result(result);
    });
    tear_down_test(task);
}

// Ends everything the test started, including forked tasks like clocks.
fn tear_down_test(test: Arc<Task>) {
    trigger::cancel_all_triggers();
    executor::clear_ready_queue();
    test.cancel();
}

/// Schedules all tests to run one after another and executes the first simulation tick.
pub fn start_of_simulation(tests: RstbTests) -> SimpleResult<()> {
    SIM_START.with(|s| s.set(Some(Instant::now())));
    CURRENT_TEST.with(|c| c.replace(None));
    if tests.is_empty() {
        warn!("No tests registered");
    }
    info!("Scheduling {} test(s)", tests.len());
    let tests: Vec<RstbObjSafe<Test>> = tests.iter().cloned().collect();
    TESTS.with(|t| t.replace(tests.clone()));

    let sim_root = SimObject::get_root()?;
    Task::spawn_from_future(
        async move {
            for test in tests {
                run_test(test, sim_root).await;
            }
            Ok(Val::None)
        },
        "regression",
    );
    executor::run_once();
    Ok(())
}

async fn run_test(test: RstbObjSafe<Test>, sim_root: SimObject) {
    let (name, generator) = test.with_mut(|t| (t.name.clone(), t.generator));
    info!("Running {}", name);
    TEST_START.with(|s| s.set(Some((Instant::now(), sim_time_ns()))));

    let test_handle = Task::spawn_from_future(
        async move {
            match generator(sim_root).await {
                Ok(val) => pass_test(&val.to_string()),
                Err(val) => fail_test(&val.to_string()),
            }
            Ok(Val::None)
        },
        &name,
    );
    if let Some(task) = test_handle.get_task() {
        let current = (task.clone(), test.clone());
        CURRENT_TEST.with(|c| c.replace(Some(current)));
    }
    let _ = test_handle.await;
}

/// Collects results of all registered tests. Tests without result count as failed.
pub fn summaries() -> Vec<TestSummary> {
    TESTS.with(|tests| {
        tests
            .borrow()
            .iter()
            .map(|test| {
                let t = test.get();
                let (passed, message) = match &t.result {
                    Some(Ok(val)) => (true, val.to_string()),
                    Some(Err(val)) => (false, val.to_string()),
                    None => (false, "Test did not complete".to_string()),
                };
                TestSummary {
                    name: t.name.clone(),
                    passed,
                    message,
                    time_secs: t.time_secs,
                    sim_time_ns: t.sim_time_ns,
                }
            })
            .collect()
    })
}

fn summary_table(summaries: &[TestSummary]) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(
        ["TEST", "RESULT", "SIM TIME (ns)", "REAL TIME (s)", "RATIO (ns/s)"]
            .iter()
            .map(|t| Cell::new(t))
            .collect(),
    ));
    for s in summaries {
        let ratio = if s.time_secs > 0.0 { s.sim_time_ns / s.time_secs } else { 0.0 };
        table.add_row(Row::new(vec![
            Cell::new(&s.name),
            Cell::new(if s.passed { "PASS" } else { "FAIL" }),
            Cell::new(&format!("{:.3}", s.sim_time_ns)),
            Cell::new(&format!("{:.3}", s.time_secs)),
            Cell::new(&format!("{:.3}", ratio)),
        ]));
    }
    table
}

/// Reports all test results and writes the JUnit file.
pub fn end_of_simulation(config: &Config) -> Vec<TestSummary> {
    let summaries = summaries();
    let duration = SIM_START
        .with(|s| s.get())
        .map(|start| start.elapsed().as_secs_f64())
        .unwrap_or(0.0);
    let final_sim_time = sim_time_ns();

    for line in summary_table(&summaries).to_string().lines() {
        info!("{}", line);
    }
    info!(
        "TESTS={} PASS={} FAIL={}",
        summaries.len(),
        summaries.iter().filter(|s| s.passed).count(),
        summaries.iter().filter(|s| !s.passed).count()
    );
    info!("Simulation time: {:.3} ns", final_sim_time);
    info!("Real time: {:.3} s", duration);
    if duration > 0.0 {
        info!("Simulation speed: {:.3} ns/s", final_sim_time / duration);
    }

    let suite = crate::CRATE_NAME.with(|n| n.borrow().clone());
    if let Err(e) = junit::write_junit_xml(&config.results_file, &suite, &summaries) {
        error!("Could not write {}: {}", config.results_file.display(), e);
    }
    summaries
}
