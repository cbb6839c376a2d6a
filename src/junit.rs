use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use std::fs::File;
use std::path::Path;

use crate::regression::TestSummary;

pub(crate) fn write_junit_xml(
    path: &Path,
    suite: &str,
    summaries: &[TestSummary],
) -> Result<(), Box<dyn std::error::Error>> {
    let test_cases = summaries.iter().map(|s| {
        let time = Duration::seconds_f64(s.time_secs);
        let tc = match s.passed {
            true => TestCaseBuilder::success(&s.name, time),
            false => TestCaseBuilder::failure(&s.name, time, "failure", &s.message),
        }
        .build();
        tc
    });

    let test_suite = TestSuiteBuilder::new(suite)
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    let file = File::create(path)?;
    report.write_xml(file)?;
    Ok(())
}
