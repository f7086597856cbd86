//! Stream registry
//!
//! Holds every [`StreamDefinition`] of a tap, validated and ordered so that a
//! parent always precedes its children.

use super::definition::StreamDefinition;
use crate::error::{Error, Result};
use crate::template;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Validated, topologically ordered set of streams
#[derive(Debug, Clone)]
pub struct StreamRegistry {
    streams: Vec<StreamDefinition>,
    index: HashMap<String, usize>,
}

impl StreamRegistry {
    /// Validate `definitions` and order them parents-first
    ///
    /// Ties keep declaration order.
    pub fn new(definitions: Vec<StreamDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        for def in &definitions {
            validate_definition(def)?;
            if !seen.insert(def.name.clone()) {
                return Err(Error::invalid_stream(&def.name, "duplicate stream name"));
            }
        }

        for def in &definitions {
            if let Some(parent) = def.parent_name() {
                if !seen.contains(parent) {
                    return Err(Error::invalid_stream(
                        &def.name,
                        format!("unknown parent stream '{parent}'"),
                    ));
                }
            }
        }

        let streams = topological_order(definitions)?;
        let index = streams
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();

        Ok(Self { streams, index })
    }

    /// Streams in execution order
    pub fn ordered(&self) -> &[StreamDefinition] {
        &self.streams
    }

    /// Stream names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|def| def.name.as_str()).collect()
    }

    /// Look up a stream
    pub fn get(&self, name: &str) -> Result<&StreamDefinition> {
        self.index
            .get(name)
            .map(|&i| &self.streams[i])
            .ok_or_else(|| Error::StreamNotFound {
                stream: name.to_string(),
            })
    }

    /// Whether a stream is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Streams without a parent, in execution order
    pub fn roots(&self) -> impl Iterator<Item = &StreamDefinition> {
        self.streams.iter().filter(|def| def.parent.is_none())
    }

    /// Direct children of `name`, in execution order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a StreamDefinition> {
        self.streams
            .iter()
            .filter(move |def| def.parent_name() == Some(name))
    }

    /// Ancestors of `name`, nearest first
    pub fn ancestors(&self, name: &str) -> Result<Vec<&StreamDefinition>> {
        let mut chain = Vec::new();
        let mut current = self.get(name)?;
        while let Some(parent) = current.parent_name() {
            current = self.get(parent)?;
            chain.push(current);
        }
        Ok(chain)
    }

    /// Resolve a selection into the streams that must run
    ///
    /// `None` selects everything. Unselected ancestors of a selected stream
    /// are included with `emit = false`.
    pub fn select(&self, selected: Option<&[String]>) -> Result<Selection> {
        let Some(selected) = selected else {
            return Ok(Selection {
                streams: self.streams.iter().map(|d| (d.name.clone(), true)).collect(),
            });
        };

        let mut streams = BTreeMap::new();
        for name in selected {
            self.get(name)?;
            streams.insert(name.clone(), true);
        }
        for name in selected {
            for ancestor in self.ancestors(name)? {
                streams.entry(ancestor.name.clone()).or_insert(false);
            }
        }

        Ok(Selection { streams })
    }
}

/// Streams chosen for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    streams: BTreeMap<String, bool>,
}

impl Selection {
    /// Whether the stream runs at all
    pub fn runs(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Whether the stream's records are emitted
    pub fn emits(&self, name: &str) -> bool {
        self.streams.get(name).copied().unwrap_or(false)
    }

    /// Names of emitted streams
    pub fn emitted(&self) -> BTreeSet<&str> {
        self.streams
            .iter()
            .filter(|(_, emit)| **emit)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn validate_definition(def: &StreamDefinition) -> Result<()> {
    if def.name.trim().is_empty() {
        return Err(Error::invalid_stream(&def.name, "stream name is empty"));
    }
    if def.pagination.page_size() == Some(0) {
        return Err(Error::invalid_stream(&def.name, "page size must be positive"));
    }
    if matches!(def.replication_key.as_deref(), Some(key) if key.is_empty()) {
        return Err(Error::invalid_stream(&def.name, "replication key is empty"));
    }

    let mut keys = HashSet::new();
    for key in &def.primary_keys {
        if !keys.insert(key) {
            return Err(Error::invalid_stream(
                &def.name,
                format!("primary key '{key}' listed twice"),
            ));
        }
    }

    let placeholders = template::extract_placeholders(&def.path);
    let provided = def
        .parent
        .as_ref()
        .map(|link| link.mapping.provided_keys())
        .unwrap_or_default();
    for placeholder in placeholders {
        if !provided.contains(&placeholder) {
            return Err(Error::invalid_stream(
                &def.name,
                format!("path placeholder '{{{placeholder}}}' has no context source"),
            ));
        }
    }

    Ok(())
}

/// Kahn's algorithm, always taking the earliest declared ready stream
fn topological_order(definitions: Vec<StreamDefinition>) -> Result<Vec<StreamDefinition>> {
    let position: HashMap<&str, usize> = definitions
        .iter()
        .enumerate()
        .map(|(i, def)| (def.name.as_str(), i))
        .collect();

    let mut pending: Vec<usize> = vec![0; definitions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); definitions.len()];
    for (i, def) in definitions.iter().enumerate() {
        if let Some(&parent) = def.parent_name().and_then(|p| position.get(p)) {
            pending[i] += 1;
            dependents[parent].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..definitions.len())
        .filter(|&i| pending[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(definitions.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &dependents[next] {
            pending[child] -= 1;
            if pending[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() != definitions.len() {
        let stuck = definitions
            .iter()
            .enumerate()
            .find(|(i, _)| pending[*i] > 0)
            .map(|(_, def)| def.name.clone())
            .unwrap_or_default();
        return Err(Error::invalid_stream(stuck, "parent chain forms a cycle"));
    }

    let mut slots: Vec<Option<StreamDefinition>> = definitions.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}
