//! Test suite runner.
//!
//! Iterates test groups in declaration order, gives each a fresh sandbox
//! and a fresh SUT process, runs its cases one at a time, and folds every
//! verdict into a single aggregate. Teardown is guaranteed on every path;
//! a transport failure downgrades one case, never the group.

use tracing::{error, warn};

use crate::catalog::TestGroup;
use crate::compare;
use crate::crud::{self, CrudOp};
use crate::error::{Error, Result};
use crate::harness::{HarnessOptions, Sandbox, start_sut};
use crate::transport::Driver;

/// Outcome of a full run, for the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AllPassed,
    SomeFailed,
}

impl RunOutcome {
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::AllPassed => 0,
            Self::SomeFailed => 1,
        }
    }
}

/// Run every group in the catalog against the SUT.
///
/// # Errors
///
/// Only the missing-binary condition propagates; everything else is folded
/// into the aggregate verdict.
pub async fn run_suite(opts: &HarnessOptions, groups: &[TestGroup]) -> Result<RunOutcome> {
    let driver = Driver::new(opts.port)?;
    let mut all_passed = true;

    for group in groups {
        println!("Running tests for config: {}", group.config);
        all_passed &= run_group(opts, &driver, group).await?;
    }

    if all_passed {
        println!("All integration tests passed.");
        Ok(RunOutcome::AllPassed)
    } else {
        println!("Some integration tests failed.");
        Ok(RunOutcome::SomeFailed)
    }
}

/// Run one group with guaranteed teardown.
///
/// The sandbox and SUT handle both carry `Drop` backstops, so even a panic
/// inside a case cannot leak a process or directory into the next group;
/// the normal path stops and destroys explicitly.
async fn run_group(opts: &HarnessOptions, driver: &Driver, group: &TestGroup) -> Result<bool> {
    let sandbox = Sandbox::create(&opts.sandbox_root)?;
    let sut = start_sut(opts, group).await?;

    let mut group_passed = true;
    for case in &group.cases {
        println!("Running test: {}...", case.name);
        group_passed &= run_case(driver, &sandbox, case).await;
    }

    if let Err(e) = sut.stop() {
        warn!(group = %group.config, error = %e, "server stop reported an error");
    }
    sandbox.destroy()?;
    Ok(group_passed)
}

/// Run one case; all case-local failures are absorbed here.
async fn run_case(driver: &Driver, sandbox: &Sandbox, case: &crate::catalog::TestCase) -> bool {
    let actual = match driver.send(&case.request).await {
        Ok(bytes) => bytes,
        Err(Error::Timeout { .. }) => {
            println!("{}: TIMED OUT", case.name);
            return false;
        }
        Err(e) => {
            error!(test = %case.name, error = %e, "transport failure");
            println!("{}: FAILED", case.name);
            return false;
        }
    };

    // LIST responses are matched structurally (headers byte-exact, body as
    // an unordered JSON array); everything else is byte-exact end to end.
    let is_list = case
        .crud
        .as_ref()
        .is_some_and(|exp| exp.op == CrudOp::List);
    let response_ok = if is_list {
        actual == case.expected
    } else {
        compare::bytes_equal(&case.name, &actual, &case.expected)
    };

    let verdict = match &case.crud {
        None => response_ok,
        Some(exp) => crud::validate(
            &case.name,
            exp,
            sandbox.root(),
            response_ok,
            &actual,
            &case.expected,
        ),
    };

    println!(
        "{}: {}",
        case.name,
        if verdict { "SUCCESS" } else { "FAILED" }
    );
    verdict
}
