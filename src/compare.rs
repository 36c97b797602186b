//! Response comparison primitives.
//!
//! Three small, independent checks used by the runner and the CRUD
//! validator: byte-exact equality with diagnostic diffing, header/body
//! splitting at the first blank-line boundary, and unordered JSON-array
//! equality for LIST responses.

use std::io::Write;

use serde_json::Value;
use tracing::debug;

/// Byte-exact comparison with operator diagnostics.
///
/// Only exact equality determines the boolean. On mismatch, both buffers
/// are persisted to temp files and a unified-style line diff is printed;
/// that diagnostic step is best-effort and never affects the verdict.
pub fn bytes_equal(name: &str, actual: &[u8], expected: &[u8]) -> bool {
    if actual == expected {
        return true;
    }

    if let Err(e) = persist_mismatch(name, actual, expected) {
        debug!(test = name, error = %e, "could not persist mismatch buffers");
    }
    eprint!("{}", unified_diff(expected, actual));
    false
}

fn persist_mismatch(name: &str, actual: &[u8], expected: &[u8]) -> std::io::Result<()> {
    let mut actual_file = tempfile::NamedTempFile::new()?;
    actual_file.write_all(actual)?;
    let mut expected_file = tempfile::NamedTempFile::new()?;
    expected_file.write_all(expected)?;

    let (_, actual_path) = actual_file.keep()?;
    let (_, expected_path) = expected_file.keep()?;
    eprintln!(
        "{name}: buffers kept at {} (expected) and {} (actual)",
        expected_path.display(),
        actual_path.display()
    );
    Ok(())
}

/// Unified-style line diff of two byte buffers.
///
/// Lossy UTF-8, common prefix and suffix trimmed, the differing middle
/// printed with `-` (expected) and `+` (actual) markers.
pub fn unified_diff(expected: &[u8], actual: &[u8]) -> String {
    let expected_text = String::from_utf8_lossy(expected);
    let actual_text = String::from_utf8_lossy(actual);
    let expected_lines: Vec<&str> = expected_text.lines().collect();
    let actual_lines: Vec<&str> = actual_text.lines().collect();

    let mut prefix = 0;
    while prefix < expected_lines.len()
        && prefix < actual_lines.len()
        && expected_lines[prefix] == actual_lines[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < expected_lines.len() - prefix
        && suffix < actual_lines.len() - prefix
        && expected_lines[expected_lines.len() - 1 - suffix]
            == actual_lines[actual_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mut out = String::new();
    out.push_str("--- expected\n+++ actual\n");
    for line in &expected_lines[prefix..expected_lines.len() - suffix] {
        out.push('-');
        out.push_str(line);
        out.push('\n');
    }
    for line in &actual_lines[prefix..actual_lines.len() - suffix] {
        out.push('+');
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Split a raw HTTP response into header block and body at the first
/// blank-line boundary (`\r\n\r\n`, falling back to `\n\n`).
///
/// If no separator is present the entire input is headers and the body is
/// empty. Header syntax is not validated.
pub fn split_response(response: &[u8]) -> (&[u8], &[u8]) {
    if let Some(idx) = find(response, b"\r\n\r\n") {
        (&response[..idx], &response[idx + 4..])
    } else if let Some(idx) = find(response, b"\n\n") {
        (&response[..idx], &response[idx + 2..])
    } else {
        (response, &[])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Unordered equality of two JSON arrays.
///
/// Both buffers must parse as JSON arrays; anything else is `false`.
/// Equality is set equality over elements: duplicate multiplicity is not
/// preserved, which is the contracted behavior for LIST responses where
/// ordering is a server implementation detail.
pub fn json_arrays_equal_unordered(a: &[u8], b: &[u8]) -> bool {
    let (Ok(Value::Array(a)), Ok(Value::Array(b))) = (
        serde_json::from_slice::<Value>(a),
        serde_json::from_slice::<Value>(b),
    ) else {
        return false;
    };

    a.iter().all(|v| b.contains(v)) && b.iter().all(|v| a.contains(v))
}
