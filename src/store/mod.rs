//! Store contract, shared schema bookkeeping, and the two concrete backends.
//!
//! A store owns a [`ParameterSchema`], a [`DependencyGraph`], and free-form metadata, persisted
//! together as one JSON schema file (`info.json`). Documents live next to it: one file per
//! document for [`FileStore`], one packed volume for [`SingleFileStore`].

pub(crate) mod document;
pub(crate) mod file_store;
pub(crate) mod pattern;
pub(crate) mod single_file;
pub(crate) mod volume;

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{CinemaError, CinemaResult};
use crate::foundation::value::{Descriptor, Value};
use crate::schema::dependency::DependencyGraph;
use crate::schema::parameter::{Parameter, ParameterSchema};
use crate::store::document::{Attributes, Document};
use crate::store::file_store::FileStore;
use crate::store::single_file::SingleFileStore;

/// Metadata key recording which backend wrote a store.
pub const STORE_TYPE_KEY: &str = "store_type";

/// Lazy sequence of documents produced by [`Store::find`].
pub type DocumentIter<'a> = Box<dyn Iterator<Item = CinemaResult<Document>> + 'a>;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// The persisted schema file.
pub struct StoreInfo {
    /// Parameter definitions; named `arguments` in the file for legacy readers.
    #[serde(rename = "arguments", default)]
    pub parameters: ParameterSchema,
    /// File name template (file stores only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    /// Free-form view hints and store subtype.
    #[serde(default)]
    pub metadata: Option<Attributes>,
    /// Parameter dependency rules.
    #[serde(default)]
    pub associations: DependencyGraph,
}

impl StoreInfo {
    /// Read and validate a schema file.
    pub fn read(path: &Path) -> CinemaResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read store info '{}'", path.display()))?;
        let info: StoreInfo = serde_json::from_slice(&bytes)?;
        info.parameters.validate()?;
        Ok(info)
    }

    /// Write the schema file, creating its directory when missing.
    pub fn write(&self, path: &Path) -> CinemaResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("write store info '{}'", path.display()))?;
        Ok(())
    }

    /// Backend recorded in `metadata.store_type`, if any.
    pub fn store_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(STORE_TYPE_KEY))
            .and_then(serde_json::Value::as_str)
    }
}

/// Schema and lifecycle state shared by every backend.
#[derive(Clone, Debug)]
pub struct StoreCore {
    info_path: PathBuf,
    info: StoreInfo,
    initialized: bool,
}

impl StoreCore {
    /// Fresh, uninitialized state for the schema file at `info_path`.
    pub fn new(info_path: impl Into<PathBuf>) -> Self {
        Self {
            info_path: info_path.into(),
            info: StoreInfo::default(),
            initialized: false,
        }
    }

    /// Path of the schema file.
    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Directory holding the schema file and the documents.
    pub fn root(&self) -> &Path {
        match self.info_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    /// Persisted schema state.
    pub fn info(&self) -> &StoreInfo {
        &self.info
    }

    /// Mutable persisted schema state.
    pub fn info_mut(&mut self) -> &mut StoreInfo {
        &mut self.info
    }

    /// Whether `create` or `load` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Fail when `op` runs on a store that is already created or loaded.
    pub fn check_uninitialized(&self, op: &str) -> CinemaResult<()> {
        if self.initialized {
            return Err(CinemaError::illegal_state(format!(
                "{op}() called on a store that is already loaded or created"
            )));
        }
        Ok(())
    }

    /// Record a successful `create` or `load`.
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Merge `keyval` into the metadata map.
    pub fn add_metadata(&mut self, keyval: Attributes) {
        self.info
            .metadata
            .get_or_insert_with(Attributes::new)
            .extend(keyval);
    }
}

/// Common contract of the document stores.
///
/// Backends implement lifecycle, persistence, and addressing; schema and dependency
/// bookkeeping is provided here on top of [`StoreCore`].
pub trait Store {
    /// Shared schema state.
    fn core(&self) -> &StoreCore;

    /// Mutable shared schema state.
    fn core_mut(&mut self) -> &mut StoreCore;

    /// Initialize a new store and persist its (possibly empty) schema.
    ///
    /// Fails with [`CinemaError::IllegalState`] when already created or loaded.
    fn create(&mut self) -> CinemaResult<()>;

    /// Read the persisted schema into this store.
    ///
    /// Fails with [`CinemaError::IllegalState`] when already created or loaded.
    fn load(&mut self) -> CinemaResult<()>;

    /// Persist the schema file.
    fn save(&self) -> CinemaResult<()>;

    /// Persist `document` at the location addressed by its descriptor.
    ///
    /// Creates the store first when it has not been created or loaded.
    fn insert(&mut self, document: &Document) -> CinemaResult<()>;

    /// Lazily yield documents matching `query`; omitted parameters match any value.
    fn find<'a>(&'a self, query: &Descriptor) -> CinemaResult<DocumentIter<'a>>;

    /// Write out buffered documents. Backends without buffering do nothing.
    fn flush(&mut self) -> CinemaResult<()> {
        Ok(())
    }

    /// Validation hook applied by [`Store::add_parameter`].
    fn validate_parameter(&self, name: &str, param: Parameter) -> CinemaResult<Parameter> {
        param.validate(name)?;
        Ok(param)
    }

    /// Register `param` under `name`, replacing any previous definition.
    ///
    /// Already stored documents are not rewritten.
    fn add_parameter(&mut self, name: &str, param: Parameter) -> CinemaResult<()> {
        let param = self.validate_parameter(name, param)?;
        self.core_mut().info_mut().parameters.insert(name, param);
        Ok(())
    }

    /// Look up a registered parameter.
    fn get_parameter(&self, name: &str) -> CinemaResult<&Parameter> {
        self.parameters().require(name)
    }

    /// Registered parameters.
    fn parameters(&self) -> &ParameterSchema {
        &self.core().info().parameters
    }

    /// Enumerate `dependent` only while `controller` takes one of `allowed`.
    fn assign_parameter_dependence(
        &mut self,
        dependent: &str,
        controller: &str,
        allowed: Vec<Value>,
    ) -> CinemaResult<()> {
        self.get_parameter(dependent)?;
        let domain = self.get_parameter(controller)?;
        if dependent == controller {
            return Err(CinemaError::schema(format!(
                "parameter '{dependent}' cannot depend on itself"
            )));
        }
        if let Some(v) = allowed.iter().find(|v| domain.index_of(v).is_none()) {
            return Err(CinemaError::schema(format!(
                "value {v} is not in the domain of controller '{controller}'"
            )));
        }
        self.core_mut()
            .info_mut()
            .associations
            .assign(dependent, controller, allowed);
        Ok(())
    }

    /// Parameter dependency rules.
    fn associations(&self) -> &DependencyGraph {
        &self.core().info().associations
    }

    /// Free-form metadata.
    fn metadata(&self) -> Option<&Attributes> {
        self.core().info().metadata.as_ref()
    }

    /// Replace the metadata.
    fn set_metadata(&mut self, metadata: Option<Attributes>) {
        self.core_mut().info_mut().metadata = metadata;
    }

    /// Merge keys into the metadata.
    fn add_metadata(&mut self, keyval: Attributes) {
        self.core_mut().add_metadata(keyval);
    }

    /// Full descriptor: every parameter's default, overlaid with `partial`.
    fn get_complete_descriptor(&self, partial: &Descriptor) -> Descriptor {
        self.parameters().complete(partial)
    }

    /// Path of the schema file.
    fn info_path(&self) -> &Path {
        self.core().info_path()
    }
}

/// Open and load an existing store, picking the backend from its schema file.
///
/// `metadata.store_type == "SFS"` selects [`SingleFileStore`]; anything else is a
/// [`FileStore`].
pub fn open_store(info_path: impl Into<PathBuf>) -> CinemaResult<Box<dyn Store>> {
    let info_path = info_path.into();
    let info = StoreInfo::read(&info_path)?;
    let mut store: Box<dyn Store> = match info.store_type() {
        Some(single_file::STORE_TYPE) => Box::new(SingleFileStore::new(info_path)),
        _ => Box::new(FileStore::new(info_path)),
    };
    store.load()?;
    Ok(store)
}

#[cfg(test)]
#[path = "../../tests/unit/store/core.rs"]
mod tests;
