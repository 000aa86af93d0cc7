//! Endpoint path normalization.
//!
//! Turns the raw `endpoint.prefix` / `endpoint.test` / `endpoint.websocket`
//! fields into absolute paths with single separators and no trailing slash.

/// Test path used when an endpoint declares neither a test nor a websocket path.
pub const DEFAULT_TEST_PATH: &str = "test";

/// Normalized `(test_path, websocket_path)` pair for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPaths {
    pub test: String,
    pub websocket: String,
}

/// Normalize the raw path fields of one endpoint.
///
/// When both raw paths are empty the test page defaults to
/// [`DEFAULT_TEST_PATH`]. A non-empty prefix is joined in front of both.
pub fn normalize_paths(prefix: &str, test: &str, websocket: &str) -> EndpointPaths {
    let test = if test.is_empty() && websocket.is_empty() {
        DEFAULT_TEST_PATH
    } else {
        test
    };

    let (test, websocket) = if prefix.is_empty() {
        (test.to_string(), websocket.to_string())
    } else {
        (format!("{}/{}", prefix, test), format!("{}/{}", prefix, websocket))
    };

    EndpointPaths {
        test: absolute(&test),
        websocket: absolute(&websocket),
    }
}

/// `"a//b/"` → `"/a/b"`, `""` → `"/"`.
fn absolute(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
