//! Static assets and the test page.
//!
//! # Responsibilities
//! - Serve files from the embedded `assets/` tree, or from disk in
//!   development mode
//! - Map file extensions to content types
//! - Parse and render the test page template
//!
//! # Design Decisions
//! - Each listener owns its own `TestPageCache`
//! - Embedded mode parses the template once; disk mode re-reads it on
//!   every render so edits show up without a restart

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use include_dir::{include_dir, Dir};
use tokio::sync::OnceCell;

static EMBEDDED: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Asset path of the test page template.
pub const TEST_PAGE: &str = "static/test.html";

/// Where assets are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssetSource {
    #[default]
    Embedded,
    /// Directory laid out like `assets/`, read on every request.
    Directory(PathBuf),
}

impl AssetSource {
    /// Load an asset by its path relative to the asset root.
    pub async fn load(&self, asset: &str) -> Option<Cow<'static, [u8]>> {
        match self {
            AssetSource::Embedded => EMBEDDED
                .get_file(asset)
                .map(|file| Cow::Borrowed(file.contents())),
            AssetSource::Directory(root) => {
                if !is_contained(asset) {
                    tracing::warn!(asset, "Rejected asset path outside the asset root");
                    return None;
                }
                tokio::fs::read(root.join(asset)).await.ok().map(Cow::Owned)
            }
        }
    }

    fn rereads(&self) -> bool {
        matches!(self, AssetSource::Directory(_))
    }
}

fn is_contained(asset: &str) -> bool {
    Path::new(asset)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// Content type for a file extension (including the dot).
pub fn content_type(extension: &str) -> &'static str {
    match extension {
        ".js" => "application/javascript",
        ".htm" | ".html" => "text/html; charset=utf-8",
        ".css" => "text/css; charset=utf-8",
        ".json" => "application/json",
        ".xml" => "text/xml; charset=utf-8",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".svg" => "image/svg+xml",
        ".gif" => "image/gif",
        ".ico" => "image/x-icon",
        ".pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    TestPath,
    WebSocketUrl,
}

/// Test page template with `{{ test_path }}` and `{{ ws_url }}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPageTemplate {
    segments: Vec<Segment>,
}

impl TestPageTemplate {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start..].find("}}") else {
                break;
            };
            let placeholder = match rest[start + 2..start + len].trim() {
                "test_path" => Segment::TestPath,
                "ws_url" => Segment::WebSocketUrl,
                _ => {
                    literal.push_str(&rest[..start + len + 2]);
                    rest = &rest[start + len + 2..];
                    continue;
                }
            };
            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(placeholder);
            rest = &rest[start + len + 2..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Render with HTML-escaped values.
    pub fn render(&self, test_path: &str, ws_url: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::TestPath => push_escaped(&mut out, test_path),
                Segment::WebSocketUrl => push_escaped(&mut out, ws_url),
            }
        }
        out
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Lazily parsed test page template for one listener.
#[derive(Debug, Default)]
pub struct TestPageCache {
    source: AssetSource,
    parsed: OnceCell<Arc<TestPageTemplate>>,
}

impl TestPageCache {
    pub fn new(source: AssetSource) -> Self {
        Self {
            source,
            parsed: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    /// The current template, or `None` if the page asset is missing.
    pub async fn template(&self) -> Option<Arc<TestPageTemplate>> {
        if self.source.rereads() {
            return self.load().await;
        }
        self.parsed
            .get_or_try_init(|| async { self.load().await.ok_or(()) })
            .await
            .ok()
            .cloned()
    }

    async fn load(&self) -> Option<Arc<TestPageTemplate>> {
        let raw = self.source.load(TEST_PAGE).await?;
        Some(Arc::new(TestPageTemplate::parse(&String::from_utf8_lossy(&raw))))
    }
}
