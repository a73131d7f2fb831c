use std::{fs::File, io::BufReader, path::Path};

use serde_json::Value;

use crate::foundation::error::{TraitStackError, TraitStackResult};

/// Reserved attribute name carrying the entry's external identifier.
pub const ID_KEY: &str = "id";

/// Reserved trait value meaning "select nothing for this attribute".
pub const NO_TRAITS: &str = "No Traits";

/// One manifest entry: attribute name to trait value, in document order.
///
/// The entry's index is its position in the manifest and doubles as the output file number.
#[derive(Clone, Debug, PartialEq)]
pub struct TraitSet {
    index: usize,
    id: Option<Value>,
    traits: Vec<(String, String)>,
}

impl TraitSet {
    /// Build a trait set from ordered pairs. An `"id"` pair becomes [`TraitSet::id`].
    pub fn from_pairs<K, V>(index: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut id = None;
        let mut traits = Vec::new();
        for (k, v) in pairs {
            let (k, v) = (k.into(), v.into());
            if k == ID_KEY {
                id = Some(Value::String(v));
            } else {
                traits.push((k, v));
            }
        }
        Self { index, id, traits }
    }

    /// Position in the manifest.
    pub fn index(&self) -> usize {
        self.index
    }

    /// External identifier from the reserved `"id"` key, if present.
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// All attribute/value pairs except the reserved `"id"` key, sentinels included.
    pub fn traits(&self) -> &[(String, String)] {
        &self.traits
    }

    /// Attribute/value pairs that select layers: sentinel values are skipped.
    pub fn selections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.traits
            .iter()
            .filter(|(_, v)| v != NO_TRAITS)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Ordered, read-only list of trait sets. Manifest order defines output numbering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraitManifest {
    entries: Vec<TraitSet>,
}

impl TraitManifest {
    /// Wrap already-built trait sets. Indices are reassigned from position.
    pub fn new(entries: Vec<TraitSet>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(index, set)| TraitSet { index, ..set })
            .collect();
        Self { entries }
    }

    /// Parse a manifest JSON array from a reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> TraitStackResult<Self> {
        let value: Value = serde_json::from_reader(r)
            .map_err(|e| TraitStackError::manifest(format!("parse manifest JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parse a manifest JSON array from a string.
    pub fn from_json_str(s: &str) -> TraitStackResult<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| TraitStackError::manifest(format!("parse manifest JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parse a manifest JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> TraitStackResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TraitStackError::manifest(format!("open manifest '{}': {e}", path.display()))
        })?;
        let manifest = Self::from_reader(BufReader::new(f))?;
        tracing::info!(path = %path.display(), entries = manifest.len(), "loaded manifest");
        Ok(manifest)
    }

    fn from_value(value: Value) -> TraitStackResult<Self> {
        let Value::Array(items) = value else {
            return Err(TraitStackError::manifest(
                "manifest must be a JSON array of objects",
            ));
        };

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(map) = item else {
                return Err(TraitStackError::manifest(format!(
                    "entry {index} must be a JSON object"
                )));
            };

            let mut id = None;
            let mut traits = Vec::with_capacity(map.len());
            for (key, value) in map {
                if key == ID_KEY {
                    id = Some(value);
                    continue;
                }
                let trait_value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => NO_TRAITS.to_string(),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(TraitStackError::manifest(format!(
                            "entry {index} attribute '{key}' must be a string trait value"
                        )));
                    }
                };
                traits.push((key, trait_value));
            }
            entries.push(TraitSet { index, id, traits });
        }
        Ok(Self { entries })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&TraitSet> {
        self.entries.get(index)
    }

    /// All entries in manifest order.
    pub fn entries(&self) -> &[TraitSet] {
        &self.entries
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/manifest.rs"]
mod tests;
