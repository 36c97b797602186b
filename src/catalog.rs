//! Declarative test catalog.
//!
//! Test cases and groups are plain data: a name, a request (raw bytes or a
//! client path), the exact expected response, and an optional CRUD
//! side-effect expectation. The built-in catalog mirrors the protocol
//! surface of the server under test: echo, static files, malformed-input
//! rejection, and the file-backed CRUD API.

use std::path::{Path, PathBuf};

use crate::crud::{CrudExpectation, CrudOp};

/// How a test case's request reaches the server.
#[derive(Debug, Clone)]
pub enum Request {
    /// A literal byte sequence written verbatim over a fresh TCP
    /// connection. May be intentionally malformed; that is the point.
    Raw(Vec<u8>),
    /// A target path issued as a conforming HTTP GET through a real
    /// client stack.
    Client { path: String },
}

/// One protocol-level test case.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Human-readable, unique within its group.
    pub name: String,
    pub request: Request,
    /// Expected response bytes. Compared byte-exactly, except for LIST
    /// cases where the body is matched as an unordered JSON array.
    pub expected: Vec<u8>,
    pub crud: Option<CrudExpectation>,
}

impl TestCase {
    pub fn raw(name: &str, request: impl Into<Vec<u8>>, expected: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            request: Request::Raw(request.into()),
            expected: expected.into(),
            crud: None,
        }
    }

    pub fn client(name: &str, path: &str, expected: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            request: Request::Client {
                path: path.to_string(),
            },
            expected: expected.into(),
            crud: None,
        }
    }

    #[must_use]
    pub fn with_crud(mut self, crud: CrudExpectation) -> Self {
        self.crud = Some(crud);
        self
    }
}

/// An ordered sequence of test cases run against one server configuration.
///
/// Groups are independent: each gets a fresh server process and a fresh
/// sandbox directory.
#[derive(Debug, Clone)]
pub struct TestGroup {
    /// Configuration file name, resolved against one of two search roots.
    pub config: String,
    /// Resolve the config against the alternate search root.
    pub alt_config_root: bool,
    pub cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn config_path(&self, primary: &Path, alternate: &Path) -> PathBuf {
        let root = if self.alt_config_root { alternate } else { primary };
        root.join(&self.config)
    }
}

/// The built-in catalog, in declaration order.
pub fn builtin_groups() -> Vec<TestGroup> {
    vec![echo_group(), alt_static_group(), crud_group()]
}

fn echo_group() -> TestGroup {
    TestGroup {
        config: "simple_config".to_string(),
        alt_config_root: false,
        cases: vec![
            TestCase::client(
                "health endpoint via client",
                "/health",
                &b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\n\r\nOK"[..],
            ),
            TestCase::raw(
                "valid echo request",
                &b"GET /echo HTTP/1.1\r\nHost: localhost\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n"[..],
                &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 76\r\n\r\nGET /echo HTTP/1.1\r\nHost: localhost\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n"[..],
            ),
            TestCase::raw(
                "valid static file request",
                &b"GET /static/test1/test.txt HTTP/1.1\r\nHost: localhost\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n"[..],
                &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 18\r\n\r\nline1\nline2\n\nline4"[..],
            ),
            TestCase::raw(
                "invalid method is rejected",
                &b"FETCH /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"[..],
                &b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\nContent-Length: 15\r\n\r\n400 Bad Request"[..],
            ),
            TestCase::raw(
                "unsupported path returns 404",
                &b"GET /video HTTP/1.1\r\nHost: localhost\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n"[..],
                &b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\n404 Not Found"[..],
            ),
        ],
    }
}

fn alt_static_group() -> TestGroup {
    TestGroup {
        config: "static_config".to_string(),
        alt_config_root: true,
        cases: vec![TestCase::raw(
            "static file via alternate mount",
            &b"GET /file/test.txt HTTP/1.1\r\nHost: localhost\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n"[..],
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 18\r\n\r\nline1\nline2\n\nline4"[..],
        )],
    }
}

fn crud_raw(method: &str, path: &str, body: &str) -> Vec<u8> {
    let mut req = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n"
    );
    if body.is_empty() {
        req.push_str("\r\n");
    } else {
        req.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ));
    }
    req.into_bytes()
}

fn crud_group() -> TestGroup {
    let created = |id: u32| {
        format!(
            "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 9\r\n\r\n{{\"id\": {id}}}"
        )
        .into_bytes()
    };
    let not_found =
        &b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 12\r\n\r\nID not found"[..];

    TestGroup {
        config: "crud_config".to_string(),
        alt_config_root: false,
        cases: vec![
            TestCase::raw(
                "create first resource",
                crud_raw("POST", "/api/Shoes", r#"{"message":"creeper test"}"#),
                created(1),
            )
            .with_crud(CrudExpectation::write(
                CrudOp::Create,
                "Shoes/1",
                &br#"{"message":"creeper test"}"#[..],
            )),
            TestCase::raw(
                "create second resource increments id",
                crud_raw("POST", "/api/Shoes", r#"{"message":"creeper test 2"}"#),
                created(2),
            )
            .with_crud(CrudExpectation::write(
                CrudOp::Create,
                "Shoes/2",
                &br#"{"message":"creeper test 2"}"#[..],
            )),
            TestCase::raw(
                "create with malformed body is rejected",
                crud_raw("POST", "/api/Shoes", r#"{"message": creeper"#),
                &b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\nContent-Length: 17\r\n\r\nInvalid JSON body"[..],
            )
            .with_crud(CrudExpectation::rejected_create("Shoes/3")),
            TestCase::raw(
                "read existing resource",
                crud_raw("GET", "/api/Shoes/1", ""),
                &b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 26\r\n\r\n{\"message\":\"creeper test\"}"[..],
            )
            .with_crud(CrudExpectation::response_only(CrudOp::Read)),
            TestCase::raw(
                "read missing resource returns 404",
                crud_raw("GET", "/api/Shoes/99", ""),
                not_found,
            )
            .with_crud(CrudExpectation::response_only(CrudOp::Read)),
            TestCase::raw(
                "list resources is order independent",
                crud_raw("GET", "/api/Shoes/", ""),
                &b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 10\r\n\r\n[\"1\", \"2\"]"[..],
            )
            .with_crud(CrudExpectation::response_only(CrudOp::List)),
            TestCase::raw(
                "update existing resource",
                crud_raw("PUT", "/api/Shoes/1", r#"{"message":"updated"}"#),
                &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n"[..],
            )
            .with_crud(CrudExpectation::write(
                CrudOp::Update,
                "Shoes/1",
                &br#"{"message":"updated"}"#[..],
            )),
            TestCase::raw(
                "update missing resource creates it",
                crud_raw("PUT", "/api/Shoes/4", r#"{"message":"creeper test 4"}"#),
                &b"HTTP/1.1 201 Created\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n"[..],
            )
            .with_crud(CrudExpectation::write(
                CrudOp::Update,
                "Shoes/4",
                &br#"{"message":"creeper test 4"}"#[..],
            )),
            TestCase::raw(
                "delete existing resource",
                crud_raw("DELETE", "/api/Shoes/2", ""),
                &b"HTTP/1.1 204 No Content\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n"[..],
            )
            .with_crud(CrudExpectation::deleted("Shoes/2")),
            TestCase::raw(
                "delete missing resource returns 404",
                crud_raw("DELETE", "/api/Shoes/99", ""),
                not_found,
            )
            .with_crud(CrudExpectation::deleted("Shoes/99")),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_names_unique_within_each_group() {
        for group in builtin_groups() {
            let mut names: Vec<&str> = group.cases.iter().map(|c| c.name.as_str()).collect();
            names.sort_unstable();
            let before = names.len();
            names.dedup();
            assert_eq!(before, names.len(), "duplicate names in {}", group.config);
        }
    }

    #[test]
    fn raw_requests_declare_matching_content_length() {
        let req = crud_raw("POST", "/api/Shoes", r#"{"message":"creeper test"}"#);
        let text = String::from_utf8(req).unwrap();
        assert!(text.contains("Content-Length: 26\r\n"));
        assert!(text.ends_with(r#"{"message":"creeper test"}"#));
    }

    #[test]
    fn config_path_honors_search_root_flag() {
        let groups = builtin_groups();
        let primary = PathBuf::from("confs");
        let alternate = PathBuf::from("alt_confs");

        let echo = &groups[0];
        assert!(!echo.alt_config_root);
        assert_eq!(
            echo.config_path(&primary, &alternate),
            PathBuf::from("confs/simple_config")
        );

        let alt = &groups[1];
        assert!(alt.alt_config_root);
        assert_eq!(
            alt.config_path(&primary, &alternate),
            PathBuf::from("alt_confs/static_config")
        );
    }

    #[test]
    fn crud_group_covers_every_operation_kind() {
        let group = crud_group();
        let has = |op: CrudOp| {
            group
                .cases
                .iter()
                .filter_map(|c| c.crud.as_ref())
                .any(|e| e.op == op)
        };
        assert!(has(CrudOp::Create));
        assert!(has(CrudOp::Read));
        assert!(has(CrudOp::Update));
        assert!(has(CrudOp::Delete));
        assert!(has(CrudOp::List));
    }

    #[test]
    fn expected_responses_are_self_consistent() {
        // Every byte-exact expectation must declare a Content-Length that
        // matches its own body.
        for group in builtin_groups() {
            for case in &group.cases {
                let (headers, body) = crate::compare::split_response(&case.expected);
                let headers = String::from_utf8_lossy(headers).to_lowercase();
                let declared: usize = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length: "))
                    .unwrap_or_else(|| panic!("{}: no content-length", case.name))
                    .trim()
                    .parse()
                    .unwrap();
                assert_eq!(declared, body.len(), "{}: content-length mismatch", case.name);
            }
        }
    }
}
