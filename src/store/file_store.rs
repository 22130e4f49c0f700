use std::path::{Path, PathBuf};

use anyhow::Context as _;
use regex::Regex;
use walkdir::WalkDir;

use crate::foundation::error::{CinemaError, CinemaResult};
use crate::foundation::value::Descriptor;
use crate::store::document::{Attributes, Document, Payload};
use crate::store::pattern::NamePattern;
use crate::store::{DocumentIter, STORE_TYPE_KEY, Store, StoreCore, StoreInfo};

/// `metadata.store_type` written by [`FileStore::create`].
pub const STORE_TYPE: &str = "FS";

/// Suffix of the per-document sidecar holding descriptor and attributes.
pub const SIDECAR_SUFFIX: &str = ".__data__";

/// Options controlling [`FileStore`] persistence.
#[derive(Clone, Debug)]
pub struct FileStoreOpts {
    /// Write a `<file>.__data__` JSON sidecar with descriptor and attributes on insert.
    pub write_sidecars: bool,
}

impl Default for FileStoreOpts {
    fn default() -> Self {
        Self {
            write_sidecars: true,
        }
    }
}

/// How a payload file was written, so read-back returns the same [`Payload`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum PayloadKind {
    Bytes,
    Image,
}

impl PayloadKind {
    fn of(payload: &Payload) -> Self {
        match payload {
            Payload::Bytes(_) => Self::Bytes,
            Payload::Image(_) => Self::Image,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Sidecar {
    descriptor: Descriptor,
    #[serde(default)]
    attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<PayloadKind>,
}

/// Store backed by one file per document under the schema file's directory.
///
/// File locations come from a name pattern (see [`NamePattern`]); `find` walks the directory
/// tree in file-name order and recovers each match's descriptor from its path.
pub struct FileStore {
    core: StoreCore,
    pattern: Option<NamePattern>,
    opts: FileStoreOpts,
}

impl FileStore {
    /// Store whose schema file is `info_path` (conventionally `<dir>/info.json`).
    pub fn new(info_path: impl Into<PathBuf>) -> Self {
        Self::with_opts(info_path, FileStoreOpts::default())
    }

    /// Store with explicit options.
    pub fn with_opts(info_path: impl Into<PathBuf>, opts: FileStoreOpts) -> Self {
        Self {
            core: StoreCore::new(info_path),
            pattern: None,
            opts,
        }
    }

    /// Assign and compile the file name template.
    pub fn set_filename_pattern(&mut self, template: &str) -> CinemaResult<()> {
        self.pattern = Some(NamePattern::compile(template)?);
        self.core.info_mut().name_pattern = Some(template.to_string());
        Ok(())
    }

    /// The file name template, if assigned.
    pub fn filename_pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(NamePattern::template)
    }

    /// File suffix implied by the name pattern (e.g. `.png`).
    pub fn image_type(&self) -> Option<&str> {
        self.pattern.as_ref().and_then(NamePattern::image_type)
    }

    /// Absolute location of `document`'s payload file.
    ///
    /// The descriptor is completed with defaults first. [`Document::extension`] replaces the
    /// pattern's suffix when set.
    pub fn get_filename(&self, document: &Document) -> CinemaResult<PathBuf> {
        let pattern = self.require_pattern()?;
        let desc = self.get_complete_descriptor(document.descriptor());
        let mut rel = pattern.format(&desc)?;
        if let Some(ext) = &document.extension {
            if let Some(current) = pattern.image_type()
                && rel.ends_with(current)
            {
                rel.truncate(rel.len() - current.len());
            }
            rel.push_str(ext);
        }
        Ok(self.core.root().join(rel))
    }

    fn require_pattern(&self) -> CinemaResult<&NamePattern> {
        self.pattern
            .as_ref()
            .ok_or_else(|| CinemaError::illegal_state("file store has no filename pattern"))
    }

    fn load_document(
        &self,
        pattern: &NamePattern,
        parser: &Regex,
        path: &Path,
        rel: &str,
    ) -> Option<Document> {
        let schema = self.parameters();
        let mut descriptor = pattern.descriptor_with(parser, rel, schema)?;
        let mut attributes = None;
        let mut kind = PayloadKind::Bytes;
        if let Some(sidecar) = read_sidecar(path) {
            for (name, value) in sidecar.descriptor {
                if !pattern.has_placeholder(&name) {
                    descriptor.insert(name, value);
                }
            }
            attributes = sidecar.attributes;
            kind = sidecar.payload.unwrap_or(PayloadKind::Bytes);
        }
        let mut doc = Document::new(self.get_complete_descriptor(&descriptor));
        doc.data = read_payload(path, kind);
        doc.attributes = attributes;
        Some(doc)
    }
}

impl Store for FileStore {
    fn core(&self) -> &StoreCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StoreCore {
        &mut self.core
    }

    fn create(&mut self) -> CinemaResult<()> {
        self.core.check_uninitialized("create")?;
        self.core.add_metadata(Attributes::from_iter([(
            STORE_TYPE_KEY.to_string(),
            serde_json::Value::from(STORE_TYPE),
        )]));
        self.save()?;
        self.core.mark_initialized();
        tracing::info!(path = %self.core.info_path().display(), "created file store");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(path = %self.core.info_path().display()))]
    fn load(&mut self) -> CinemaResult<()> {
        self.core.check_uninitialized("load")?;
        let info = StoreInfo::read(self.core.info_path())?;
        self.pattern = info
            .name_pattern
            .as_deref()
            .map(NamePattern::compile)
            .transpose()?;
        *self.core.info_mut() = info;
        self.core.mark_initialized();
        tracing::info!(
            parameters = self.parameters().len(),
            "loaded file store"
        );
        Ok(())
    }

    fn save(&self) -> CinemaResult<()> {
        self.core.info().write(self.core.info_path())
    }

    fn insert(&mut self, document: &Document) -> CinemaResult<()> {
        if !self.core.is_initialized() {
            self.create()?;
        }
        let path = self.get_filename(document)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create document directory '{}'", parent.display()))?;
        }
        if let Some(data) = &document.data {
            write_payload(&path, data)?;
        }
        if self.opts.write_sidecars {
            let sidecar = Sidecar {
                descriptor: document.descriptor().clone(),
                attributes: document.attributes.clone(),
                payload: document.data.as_ref().map(PayloadKind::of),
            };
            let sidecar_path = sidecar_path(&path);
            let json = serde_json::to_vec(&sidecar)?;
            std::fs::write(&sidecar_path, json)
                .with_context(|| format!("write sidecar '{}'", sidecar_path.display()))?;
        }
        tracing::debug!(path = %path.display(), "inserted document");
        Ok(())
    }

    fn find<'a>(&'a self, query: &Descriptor) -> CinemaResult<DocumentIter<'a>> {
        let pattern = self.require_pattern()?;
        let schema = self.parameters();

        // Use the domain's own spelling so `20.0` finds files written as `20`.
        let mut wanted = Descriptor::new();
        let mut placed = Descriptor::new();
        for (name, value) in query {
            let value = schema
                .get(name)
                .and_then(|p| p.index_of(value).map(|i| p.values[i].clone()))
                .unwrap_or_else(|| value.clone());
            if pattern.has_placeholder(name) {
                placed.insert(name.clone(), value.clone());
            }
            wanted.insert(name.clone(), value);
        }
        let matcher = pattern.matcher(&placed)?;
        let parser = pattern.schema_parser(schema)?;
        tracing::debug!(glob = %pattern.glob(&placed), "file store query");

        let root = self.core.root().to_path_buf();
        let info_path = self.core.info_path().to_path_buf();
        let walker = WalkDir::new(&root).sort_by_file_name().into_iter();
        let iter = walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable store entry");
                    return None;
                }
            };
            if !entry.file_type().is_file() || entry.path() == info_path {
                return None;
            }
            let rel = relative_slash_path(&root, entry.path())?;
            if rel.ends_with(SIDECAR_SUFFIX) || !matcher.is_match(&rel) {
                return None;
            }
            let doc = self.load_document(pattern, &parser, entry.path(), &rel)?;
            // The path matcher alone lets `{color}=depth` select `depth_map_1.txt`.
            let keep = wanted
                .iter()
                .all(|(k, v)| doc.descriptor().get(k) == Some(v));
            keep.then_some(Ok(doc))
        });
        Ok(Box::new(iter))
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(SIDECAR_SUFFIX);
    PathBuf::from(s)
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn write_payload(path: &Path, data: &Payload) -> CinemaResult<()> {
    match data {
        Payload::Bytes(bytes) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("write document '{}'", path.display()))?;
        }
        Payload::Image(img) => {
            let format = image::ImageFormat::from_path(path).map_err(|_| {
                CinemaError::payload(format!(
                    "cannot encode an image payload for '{}': no image suffix",
                    path.display()
                ))
            })?;
            img.save_with_format(path, format)
                .with_context(|| format!("encode image '{}'", path.display()))?;
        }
    }
    Ok(())
}

/// Best-effort payload read: unreadable or undecodable files yield `None`.
///
/// Only files recorded as [`PayloadKind::Image`] are decoded; everything else comes back
/// verbatim.
fn read_payload(path: &Path, kind: PayloadKind) -> Option<Payload> {
    let result = match kind {
        PayloadKind::Image => image::ImageReader::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|r| r.with_guessed_format().map_err(anyhow::Error::from))
            .and_then(|r| r.decode().map_err(anyhow::Error::from))
            .map(|img| Payload::Image(img.to_rgb8())),
        PayloadKind::Bytes => std::fs::read(path)
            .map(Payload::Bytes)
            .map_err(anyhow::Error::from),
    };
    match result {
        Ok(payload) => Some(payload),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "document payload unreadable");
            None
        }
    }
}

fn read_sidecar(path: &Path) -> Option<Sidecar> {
    let bytes = std::fs::read(sidecar_path(path)).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(sidecar) => Some(sidecar),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed sidecar");
            None
        }
    }
}
