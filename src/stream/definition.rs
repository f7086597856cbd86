//! Stream definitions
//!
//! A [`StreamDefinition`] is an immutable value describing one resource. How it
//! is executed ([`Capabilities`]) is derived from its fields and from the
//! children that run under it in an execution plan, never declared.

use super::context::RequestContext;
use crate::decode::{ContentDecoder, RecordLayout};
use crate::error::{Error, Result};
use crate::normalize::PostProcess;
use crate::pagination::{PaginationConfig, Paginator};
use crate::types::{JsonObject, JsonValue, SyncMode};

/// Derives a child context from a parent record
pub type ContextFn = fn(&JsonObject) -> Option<RequestContext>;

/// How a parent record becomes a child's request context
#[derive(Debug, Clone)]
pub enum ContextMapping {
    /// Copy one parent field into one context key
    Field {
        /// Field read from the parent record
        parent_field: String,
        /// Key written to the context
        context_key: String,
    },

    /// Arbitrary derivation; `None` means the parent record is unusable
    Custom {
        /// Name used in errors and logs
        name: &'static str,
        /// Context keys the derivation provides
        provides: Vec<String>,
        /// The derivation
        derive: ContextFn,
    },
}

impl ContextMapping {
    /// Context keys this mapping produces
    pub fn provided_keys(&self) -> Vec<String> {
        match self {
            Self::Field { context_key, .. } => vec![context_key.clone()],
            Self::Custom { provides, .. } => provides.clone(),
        }
    }
}

/// Link from a child stream to its parent
#[derive(Debug, Clone)]
pub struct ParentLink {
    /// Parent stream name
    pub stream: String,
    /// Context derivation
    pub mapping: ContextMapping,
}

impl ParentLink {
    /// `{context_key: parent[parent_field]}`
    pub fn field(
        stream: impl Into<String>,
        parent_field: impl Into<String>,
        context_key: impl Into<String>,
    ) -> Self {
        Self {
            stream: stream.into(),
            mapping: ContextMapping::Field {
                parent_field: parent_field.into(),
                context_key: context_key.into(),
            },
        }
    }

    /// Custom derivation
    pub fn custom(
        stream: impl Into<String>,
        name: &'static str,
        provides: &[&str],
        derive: ContextFn,
    ) -> Self {
        Self {
            stream: stream.into(),
            mapping: ContextMapping::Custom {
                name,
                provides: provides.iter().map(|s| (*s).to_string()).collect(),
                derive,
            },
        }
    }

    /// Build the context for `child` from one parent record
    ///
    /// A missing or null parent field is a child-context error scoped to this
    /// one invocation.
    pub fn context_for(&self, child: &str, record: &JsonObject) -> Result<RequestContext> {
        match &self.mapping {
            ContextMapping::Field {
                parent_field,
                context_key,
            } => match record.get(parent_field) {
                None | Some(JsonValue::Null) => Err(Error::child_context(child, parent_field)),
                Some(value) => Ok(RequestContext::new().with(context_key.clone(), value.clone())),
            },
            ContextMapping::Custom { name, derive, .. } => {
                derive(record).ok_or_else(|| Error::child_context(child, *name))
            }
        }
    }
}

/// How a stream is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// More than one page may be requested
    pub paginated: bool,
    /// Other streams derive their context from this one
    pub has_children: bool,
    /// Integer coercion runs on every record
    pub needs_coercion: bool,
}

/// Immutable descriptor of one stream
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Resource path; may contain `{placeholder}`s
    pub path: String,
    /// Primary key fields, ordered
    pub primary_keys: Vec<String>,
    /// Replication key for incremental sync
    pub replication_key: Option<String>,
    /// Paging behaviour
    pub pagination: PaginationConfig,
    /// Fields coerced to integers
    pub integer_fields: Vec<String>,
    /// Shape of `content`
    pub layout: RecordLayout,
    /// Fixed query parameters
    pub extra_params: Vec<(String, String)>,
    /// Post-processing hooks, in order
    pub hooks: Vec<PostProcess>,
    /// JSON Schema of emitted records
    pub schema: JsonValue,
    /// Parent link for dependent streams
    pub parent: Option<ParentLink>,
}

impl StreamDefinition {
    /// A full-table, single-page stream with an `id` primary key
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_keys: vec!["id".to_string()],
            replication_key: None,
            pagination: PaginationConfig::None,
            integer_fields: Vec::new(),
            layout: RecordLayout::Array,
            extra_params: Vec::new(),
            hooks: Vec::new(),
            schema: JsonValue::Object(JsonObject::new()),
            parent: None,
        }
    }

    /// Replace the primary key fields; empty means records are never skipped
    #[must_use]
    pub fn primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Track an incremental bookmark on `key`
    #[must_use]
    pub fn replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Page through results `page_size` records at a time
    #[must_use]
    pub fn paginated(mut self, page_size: u64) -> Self {
        self.pagination = PaginationConfig::offset(page_size);
        self
    }

    /// Fields coerced to integers before post-processing
    #[must_use]
    pub fn integer_fields(mut self, fields: &[&str]) -> Self {
        self.integer_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Shape of the `content` payload
    #[must_use]
    pub fn layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Append a fixed query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    /// Append a post-processing hook
    #[must_use]
    pub fn hook(mut self, hook: PostProcess) -> Self {
        self.hooks.push(hook);
        self
    }

    /// JSON Schema announced for this stream
    #[must_use]
    pub fn schema(mut self, schema: JsonValue) -> Self {
        self.schema = schema;
        self
    }

    /// Run once per record of the linked parent
    #[must_use]
    pub fn child_of(mut self, link: ParentLink) -> Self {
        self.parent = Some(link);
        self
    }

    /// Incremental when a replication key is declared
    pub fn sync_mode(&self) -> SyncMode {
        if self.replication_key.is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullRefresh
        }
    }

    /// Name of the parent stream, if any
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_ref().map(|link| link.stream.as_str())
    }

    /// Capabilities given whether other streams depend on this one
    pub fn capabilities(&self, has_children: bool) -> Capabilities {
        Capabilities {
            paginated: self.pagination.is_paginated(),
            has_children,
            needs_coercion: !self.integer_fields.is_empty(),
        }
    }

    /// Record decoder for this stream's layout
    pub fn decoder(&self) -> ContentDecoder {
        ContentDecoder::new(self.layout.clone())
    }

    /// A fresh paginator
    pub fn paginator(&self) -> Box<dyn Paginator> {
        self.pagination.paginator()
    }

    /// First primary key field that is absent or null in `record`
    pub fn missing_primary_key<'a>(&'a self, record: &JsonObject) -> Option<&'a str> {
        self.primary_keys
            .iter()
            .find(|key| matches!(record.get(key.as_str()), None | Some(JsonValue::Null)))
            .map(String::as_str)
    }
}
