//! CRUD side-effect validation.
//!
//! A test case that exercises a CRUD endpoint declares, alongside its
//! expected response, what the call must have done to the server's
//! file-backed resource store. This module checks those declarations
//! after the response has been compared: file presence or absence, exact
//! content, and JSON well-formedness, each reported individually before
//! the case's final verdict.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::compare;

/// The operation kind a test case claims to perform.
///
/// Closed set with exhaustive matching: adding a kind is a compile-time
/// checked change everywhere it is dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOp {
    Create,
    Read,
    Update,
    Delete,
    List,
}

/// Declarative assertion about a test case's required filesystem side effect.
#[derive(Debug, Clone)]
pub struct CrudExpectation {
    pub op: CrudOp,
    /// Target file, relative to the sandbox root (`<resource>/<id>`).
    /// `None` for operations without a single target (LIST, or READ of a
    /// missing id).
    pub file: Option<PathBuf>,
    /// Exact bytes the target file must hold. Required when a write is
    /// expected.
    pub expected_content: Option<Vec<u8>>,
    /// Does this operation's success imply a filesystem mutation?
    pub expect_write: bool,
}

impl CrudExpectation {
    /// Expectation for a create/update that must leave `file` holding
    /// exactly `content`.
    pub fn write(op: CrudOp, file: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            op,
            file: Some(file.into()),
            expected_content: Some(content.into()),
            expect_write: true,
        }
    }

    /// Expectation for a rejected create: the file must NOT exist afterwards.
    pub fn rejected_create(file: impl Into<PathBuf>) -> Self {
        Self {
            op: CrudOp::Create,
            file: Some(file.into()),
            expected_content: None,
            expect_write: false,
        }
    }

    /// Expectation for a delete: the file must be absent afterwards.
    pub fn deleted(file: impl Into<PathBuf>) -> Self {
        Self {
            op: CrudOp::Delete,
            file: Some(file.into()),
            expected_content: None,
            expect_write: false,
        }
    }

    /// Expectation carrying no filesystem claim beyond the response itself.
    pub fn response_only(op: CrudOp) -> Self {
        Self {
            op,
            file: None,
            expected_content: None,
            expect_write: false,
        }
    }
}

/// Validate a test case's declared side effect after its response has been
/// received.
///
/// `response_ok` is the byte-exact response verdict computed by the caller;
/// `actual`/`expected` are the raw response buffers (needed for the LIST
/// structural comparison). Returns the operation-specific verdict; the
/// caller combines it with response correctness per the overall contract.
pub fn validate(
    name: &str,
    exp: &CrudExpectation,
    sandbox_root: &Path,
    response_ok: bool,
    actual: &[u8],
    expected: &[u8],
) -> bool {
    match exp.op {
        CrudOp::Create | CrudOp::Update => {
            validate_write(name, exp, sandbox_root, response_ok)
        }
        CrudOp::Read => response_ok,
        CrudOp::Delete => validate_delete(name, exp, sandbox_root, response_ok),
        CrudOp::List => validate_list(name, response_ok, actual, expected),
    }
}

fn target_path(exp: &CrudExpectation, sandbox_root: &Path) -> Option<PathBuf> {
    exp.file.as_ref().map(|f| sandbox_root.join(f))
}

/// CREATE and UPDATE share one contract: an expected write must leave the
/// file present with exactly the declared bytes, parsing as well-formed
/// JSON; a rejected create must leave no file behind. The validator does
/// not distinguish "updated existing" from "created new".
fn validate_write(
    name: &str,
    exp: &CrudExpectation,
    sandbox_root: &Path,
    response_ok: bool,
) -> bool {
    let Some(path) = target_path(exp, sandbox_root) else {
        return response_ok;
    };
    let file_exists = path.exists();

    if !exp.expect_write {
        // Rejection case (e.g. malformed body): the store must be untouched.
        if file_exists {
            warn!(test = name, path = %path.display(), "file created by a call that should not write");
        }
        return response_ok && !file_exists;
    }

    if !file_exists {
        warn!(test = name, path = %path.display(), "expected file missing after write");
        return false;
    }

    let content = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(test = name, path = %path.display(), error = %e, "failed to read written file");
            return false;
        }
    };

    let mut ok = response_ok;

    if let Some(want) = &exp.expected_content
        && content != *want
    {
        warn!(test = name, path = %path.display(), "file content does not match expected bytes");
        ok = false;
    }

    if serde_json::from_slice::<serde_json::Value>(&content).is_err() {
        warn!(test = name, path = %path.display(), "file content is not well-formed JSON");
        ok = false;
    }

    ok
}

/// DELETE's verdict is file absence only. Response correctness is still
/// computed and reported by the caller, but a mismatch there does not flip
/// this verdict; the discrepancy is logged so it stays visible.
fn validate_delete(
    name: &str,
    exp: &CrudExpectation,
    sandbox_root: &Path,
    response_ok: bool,
) -> bool {
    let Some(path) = target_path(exp, sandbox_root) else {
        return true;
    };
    let absent = !path.exists();
    if !absent {
        warn!(test = name, path = %path.display(), "file still present after delete");
    }
    if absent && !response_ok {
        warn!(
            test = name,
            "delete verdict passes on file absence despite response mismatch"
        );
    }
    absent
}

/// LIST compares headers byte-exactly and bodies as unordered JSON arrays.
/// Both checks run unconditionally so both failure modes get reported.
/// Whole-buffer inequality is expected here (body ordering is a server
/// implementation detail) and only noted at debug level.
fn validate_list(name: &str, response_ok: bool, actual: &[u8], expected: &[u8]) -> bool {
    if !response_ok {
        debug!(
            test = name,
            "list response differs byte-for-byte; structural comparison governs"
        );
    }
    let (actual_headers, actual_body) = compare::split_response(actual);
    let (expected_headers, expected_body) = compare::split_response(expected);

    let headers_ok = actual_headers == expected_headers;
    let body_ok = compare::json_arrays_equal_unordered(actual_body, expected_body);

    if !headers_ok {
        warn!(test = name, "list headers do not match byte-exactly");
    }
    if !body_ok {
        warn!(test = name, "list body is not set-equal to the expected id array");
    }

    headers_ok && body_ok
}
