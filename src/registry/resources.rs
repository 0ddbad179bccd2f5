//! Resource registry: URI-addressable readable blobs.

use std::collections::HashMap;

use crate::error::{McpError, McpResult};
use crate::protocol::{ResourceContent, ResourceDefinition};
use crate::sandbox::Sandbox;

/// A resource's executable half.
pub trait ResourceReader: Send + Sync {
    fn read(&self, uri: &str) -> McpResult<ResourceContent>;
}

impl<F> ResourceReader for F
where
    F: Fn(&str) -> McpResult<ResourceContent> + Send + Sync,
{
    fn read(&self, uri: &str) -> McpResult<ResourceContent> {
        self(uri)
    }
}

struct Entry {
    definition: ResourceDefinition,
    reader: Box<dyn ResourceReader>,
}

/// In-memory resource index, keyed by URI.
///
/// Resolution: an exact URI match wins; failing that, the first
/// registered definition whose URI is a string prefix of the requested
/// URI is used. Registration order therefore matters when more than one
/// prefix could match — callers register the most specific provider
/// first if that distinction ever matters.
#[derive(Default)]
pub struct ResourceRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ResourceDefinition, reader: impl ResourceReader + 'static) {
        let uri = definition.uri.clone();
        if !self.entries.contains_key(&uri) {
            self.order.push(uri.clone());
        }
        self.entries.insert(
            uri,
            Entry {
                definition,
                reader: Box::new(reader),
            },
        );
    }

    /// A snapshot of all registered resource definitions.
    #[must_use]
    pub fn list(&self) -> Vec<ResourceDefinition> {
        self.order
            .iter()
            .filter_map(|uri| self.entries.get(uri).map(|e| e.definition.clone()))
            .collect()
    }

    /// Resolve and read `uri`.
    ///
    /// # Errors
    ///
    /// [`McpError::ResourceNotFound`] if no registered definition matches
    /// by exact URI or prefix, or whatever error the matched reader raises.
    pub fn read(&self, uri: &str) -> McpResult<ResourceContent> {
        if let Some(entry) = self.entries.get(uri) {
            return entry.reader.read(uri);
        }
        for candidate in &self.order {
            if uri.starts_with(candidate.as_str()) {
                if let Some(entry) = self.entries.get(candidate) {
                    return entry.reader.read(uri);
                }
            }
        }
        Err(McpError::ResourceNotFound { uri: uri.to_owned() })
    }
}

/// The `file:///` resource provider, backed by a [`Sandbox`].
///
/// A read of `file:///` returns the recursive listing of the workspace as
/// a single newline-separated text body. A read of `file:///<relpath>`
/// returns that file's UTF-8 contents with MIME type `text/plain`.
pub struct FileResourceProvider {
    sandbox: Sandbox,
    max_list: usize,
}

impl FileResourceProvider {
    #[must_use]
    pub fn new(sandbox: Sandbox, max_list: usize) -> Self {
        Self { sandbox, max_list }
    }

    #[must_use]
    pub fn definition() -> ResourceDefinition {
        ResourceDefinition {
            uri: "file:///".to_owned(),
            name: Some("workspace".to_owned()),
            description: Some("Files within the sandboxed workspace root.".to_owned()),
            mime_type: None,
        }
    }
}

impl ResourceReader for FileResourceProvider {
    fn read(&self, uri: &str) -> McpResult<ResourceContent> {
        if uri == "file:///" {
            let listing = self.sandbox.list(self.max_list)?.join("\n");
            return Ok(ResourceContent {
                uri: uri.to_owned(),
                mime_type: None,
                text: Some(listing),
            });
        }

        let relative = uri.strip_prefix("file:///").unwrap_or(uri);
        let (_path, content) = self.sandbox.read(relative)?;
        Ok(ResourceContent {
            uri: uri.to_owned(),
            mime_type: Some("text/plain".to_owned()),
            text: Some(content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_uri_is_resource_not_found() {
        let registry = ResourceRegistry::new();
        let err = registry.read("file:///nope.txt").unwrap_err();
        assert!(matches!(err, McpError::ResourceNotFound { .. }));
    }

    #[test]
    fn prefix_match_resolves_to_registered_provider() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "hello").expect("write");
        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");

        let mut registry = ResourceRegistry::new();
        registry.register(FileResourceProvider::definition(), FileResourceProvider::new(sandbox, 1000));

        let content = registry.read("file:///a.txt").expect("read");
        assert_eq!(content.text.as_deref(), Some("hello"));
        assert_eq!(content.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn root_read_lists_files_newline_separated() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "1").expect("write");
        std::fs::write(dir.path().join("b.md"), "2").expect("write");
        let sandbox = Sandbox::new(Some(dir.path().to_path_buf())).expect("sandbox");

        let mut registry = ResourceRegistry::new();
        registry.register(FileResourceProvider::definition(), FileResourceProvider::new(sandbox, 1000));

        let content = registry.read("file:///").expect("read");
        let text = content.text.expect("text");
        assert!(text.contains("a.txt"));
        assert!(text.contains("b.md"));
        assert!(text.contains('\n'));
    }
}
