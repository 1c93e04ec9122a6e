use serde_json::{Map, Value};

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{Document, DocumentBackend};
use crate::domain::value_objects::{ConfigValue, ValueType};

/// Flat key/value object stored under one section
pub type Section = Map<String, Value>;

/// What `ConfigStore::load` ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Persisted document read (possibly from its backup)
    Loaded,
    /// Nothing persisted yet, started empty
    Initialized,
    /// Persisted document unreadable, started empty
    Reset,
}

/// Typed, sectioned configuration store.
///
/// Holds no document until `load()` runs; after that the store is always
/// usable, whatever state the file on disk was in.
pub struct ConfigStore {
    backend: Box<dyn DocumentBackend>,
    document: Option<Document>,
}

impl ConfigStore {
    pub fn new(backend: Box<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            document: None,
        }
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Replace the in-memory document with the persisted one
    pub fn load(&mut self) -> LoadOutcome {
        self.document = None;

        let (document, outcome) = match self.backend.read_document() {
            Ok(Some(document)) => (document, LoadOutcome::Loaded),
            Ok(None) => (Document::new(), LoadOutcome::Initialized),
            Err(e) => {
                tracing::warn!(
                    location = %self.backend.location(),
                    "Config document unusable, starting empty: {}",
                    e
                );
                (Document::new(), LoadOutcome::Reset)
            }
        };

        tracing::info!(
            location = %self.backend.location(),
            sections = document.len(),
            "Config loaded ({:?})",
            outcome
        );
        self.document = Some(document);
        outcome
    }

    /// Persist the current document. The in-memory copy stays
    /// authoritative if the write fails.
    pub fn save(&self) -> Result<()> {
        let document = self.document.as_ref().ok_or(DomainError::NoDocument)?;
        self.backend.write_document_atomic(document)?;
        tracing::debug!(location = %self.backend.location(), "Config saved");
        Ok(())
    }

    /// Write a value, validated against `declared` (or the value's own type)
    /// and the optional inclusive bounds. On error the store is unchanged.
    pub fn set_value(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<ConfigValue>,
        declared: Option<ValueType>,
        min: Option<&ConfigValue>,
        max: Option<&ConfigValue>,
    ) -> Result<()> {
        let value = value.into();
        let document = self.document.as_mut().ok_or(DomainError::NoDocument)?;

        let declared = declared.unwrap_or_else(|| value.value_type());
        if let Err(e) = value.validate(declared, min, max) {
            tracing::warn!("Rejected {}.{}: {}", section, key, e);
            return Err(e);
        }

        // Populate the key first, then (re)attach the whole section
        let mut section_obj = match document.get(section) {
            Some(Value::Object(existing)) => existing.clone(),
            _ => Section::new(),
        };
        section_obj.insert(key.to_string(), value.to_json());
        document.insert(section.to_string(), Value::Object(section_obj));

        Ok(())
    }

    /// Unvalidated write; the type is taken from the value itself
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<ConfigValue>) -> Result<()> {
        self.set_value(section, key, value, None, None, None)
    }

    /// Read a value typed like `default`, falling back to `default` when the
    /// document, section or key is missing or the stored value does not coerce
    pub fn get_value(&self, section: &str, key: &str, default: ConfigValue) -> ConfigValue {
        self.section(section)
            .and_then(|s| s.get(key))
            .and_then(|v| ConfigValue::from_json(v, default.value_type()))
            .unwrap_or(default)
    }

    /// Typed convenience over `get_value`
    pub fn get<T>(&self, section: &str, key: &str, default: T) -> T
    where
        T: Clone + Into<ConfigValue> + TryFrom<ConfigValue>,
    {
        T::try_from(self.get_value(section, key, default.clone().into())).unwrap_or(default)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        match self.document.as_ref()?.get(name)? {
            Value::Object(section) => Some(section),
            _ => None,
        }
    }

    /// Attach a fully built section, replacing any existing one
    pub fn replace_section(&mut self, name: &str, section: Section) -> Result<()> {
        let document = self.document.as_mut().ok_or(DomainError::NoDocument)?;
        document.insert(name.to_string(), Value::Object(section));
        Ok(())
    }
}
