use std::path::PathBuf;

use crate::foundation::error::{CinemaError, CinemaResult};
use crate::foundation::value::Descriptor;
use crate::schema::product::Combinations;
use crate::store::document::{Attributes, Document, Payload};
use crate::store::volume::{Volume, VolumeReader};
use crate::store::{DocumentIter, STORE_TYPE_KEY, Store, StoreCore, StoreInfo};

/// `metadata.store_type` written by [`SingleFileStore::create`].
pub const STORE_TYPE: &str = "SFS";

/// Name of the packed volume file next to the schema file.
pub const VOLUME_FILE_NAME: &str = "data.raw";

/// Store backed by one packed RGB volume, one slice per full parameter combination.
///
/// Slices are ordered by the Cartesian product of all parameters taken in lexicographic name
/// order, the last name varying fastest. Inserts are buffered in memory until
/// [`Store::flush`]; dropping a store with unflushed inserts flushes it and logs failures.
pub struct SingleFileStore {
    core: StoreCore,
    volume: Option<Volume>,
    dirty: bool,
}

impl SingleFileStore {
    /// Store whose schema file is `info_path`; the volume lives beside it.
    pub fn new(info_path: impl Into<PathBuf>) -> Self {
        Self {
            core: StoreCore::new(info_path),
            volume: None,
            dirty: false,
        }
    }

    /// Location of the packed volume file.
    pub fn volume_path(&self) -> PathBuf {
        self.core.root().join(VOLUME_FILE_NAME)
    }

    /// Total slice count: product of every parameter's domain size.
    pub fn num_slices(&self) -> usize {
        self.parameters().iter().map(|(_, p)| p.len()).product()
    }

    /// Plane dimensions of the volume, once one exists in memory or on disk.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if let Some(v) = &self.volume {
            return Some((v.width(), v.height()));
        }
        VolumeReader::open(&self.volume_path())
            .ok()
            .map(|r| r.dimensions())
    }

    /// `true` when inserts are buffered but not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Slice index of `descriptor` by mixed-radix positional arithmetic.
    ///
    /// `index = Σ_i valueIndex_i · Π_{j>i} size_j` over parameters in name order. The
    /// descriptor is completed with defaults first.
    pub fn compute_sliceindex(&self, descriptor: &Descriptor) -> CinemaResult<usize> {
        let desc = self.get_complete_descriptor(descriptor);
        let mut index = 0usize;
        for (name, param) in self.parameters().iter() {
            let value = &desc[name];
            let pos = param.index_of(value).ok_or_else(|| {
                CinemaError::query(format!("value {value} is not in the domain of '{name}'"))
            })?;
            index = index * param.len() + pos;
        }
        Ok(index)
    }

    /// Slice index of `descriptor` by scanning the full product in order.
    ///
    /// Agrees with [`SingleFileStore::compute_sliceindex`]; kept as its reference.
    pub fn compute_sliceindex_linear(&self, descriptor: &Descriptor) -> CinemaResult<usize> {
        let desc = self.get_complete_descriptor(descriptor);
        self.slice_order()?
            .find(|(_, combo)| combo.iter().all(|(k, v)| desc.get(k) == Some(v)))
            .map(|(index, _)| index)
            .ok_or_else(|| CinemaError::query("descriptor addresses no slice"))
    }

    /// Read slice `index` from memory or, when nothing is buffered, straight from the file.
    pub fn read_slice(&self, index: usize) -> CinemaResult<Option<image::RgbImage>> {
        if let Some(v) = &self.volume {
            return Ok(v.slice(index));
        }
        let path = self.volume_path();
        if !path.exists() {
            return Ok(None);
        }
        VolumeReader::open(&path)?.read_slice(index).map(Some)
    }

    /// Flush buffered inserts and release the store, reporting any write failure.
    ///
    /// Dropping the store also flushes, but can only log a failure.
    pub fn close(mut self) -> CinemaResult<()> {
        self.flush()
    }

    fn slice_order(&self) -> CinemaResult<Combinations> {
        let names: Vec<&str> = self.parameters().names().collect();
        self.parameters().combinations(&names)
    }

    fn volume_for(&mut self, plane: &image::RgbImage) -> CinemaResult<&mut Volume> {
        if self.volume.is_none() {
            let slices = self.num_slices();
            let path = self.volume_path();
            let volume = if path.exists() {
                let existing = Volume::read_from(&path)?;
                if existing.slices() != slices {
                    return Err(CinemaError::illegal_state(format!(
                        "volume '{}' holds {} slices but the schema addresses {slices}",
                        path.display(),
                        existing.slices()
                    )));
                }
                existing
            } else {
                tracing::info!(
                    width = plane.width(),
                    height = plane.height(),
                    slices,
                    "allocating packed volume"
                );
                Volume::new(plane.width(), plane.height(), slices)?
            };
            self.volume = Some(volume);
        }
        self.volume
            .as_mut()
            .ok_or_else(|| CinemaError::illegal_state("volume not allocated"))
    }
}

impl Store for SingleFileStore {
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
        tracing::info!(path = %self.core.info_path().display(), "created single file store");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(path = %self.core.info_path().display()))]
    fn load(&mut self) -> CinemaResult<()> {
        self.core.check_uninitialized("load")?;
        let mut info = StoreInfo::read(self.core.info_path())?;
        info.name_pattern = None;
        *self.core.info_mut() = info;
        self.core.mark_initialized();
        tracing::info!(slices = self.num_slices(), "loaded single file store");
        Ok(())
    }

    fn save(&self) -> CinemaResult<()> {
        self.core.info().write(self.core.info_path())
    }

    fn insert(&mut self, document: &Document) -> CinemaResult<()> {
        if !self.core.is_initialized() {
            self.create()?;
        }
        let Some(data) = &document.data else {
            tracing::debug!("document without payload, nothing to store");
            return Ok(());
        };
        let Payload::Image(plane) = data else {
            return Err(CinemaError::payload(
                "single file stores hold image payloads only",
            ));
        };
        let index = self.compute_sliceindex(document.descriptor())?;
        self.volume_for(plane)?.write_slice(index, plane)?;
        self.dirty = true;
        tracing::debug!(slice = index, "inserted document");
        Ok(())
    }

    fn find<'a>(&'a self, query: &Descriptor) -> CinemaResult<DocumentIter<'a>> {
        let order = self.slice_order()?;
        let query = query.clone();

        let mut reader = match &self.volume {
            Some(_) => None,
            None => {
                let path = self.volume_path();
                if !path.exists() {
                    return Ok(Box::new(std::iter::empty()));
                }
                Some(VolumeReader::open(&path)?)
            }
        };

        let iter = order.filter_map(move |(index, combo)| {
            if !query.iter().all(|(k, v)| combo.get(k) == Some(v)) {
                return None;
            }
            let plane = match (&self.volume, reader.as_mut()) {
                (Some(volume), _) => volume.slice(index).map(Ok),
                (None, Some(reader)) => Some(reader.read_slice(index)),
                (None, None) => None,
            };
            Some(plane?.map(|img| Document::with_data(combo, img)))
        });
        Ok(Box::new(iter))
    }

    #[tracing::instrument(skip(self), fields(path = %self.core.info_path().display()))]
    fn flush(&mut self) -> CinemaResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(volume) = &self.volume {
            volume.write_to(&self.volume_path())?;
            tracing::info!(slices = volume.slices(), "flushed packed volume");
        }
        self.dirty = false;
        Ok(())
    }
}

impl Drop for SingleFileStore {
    fn drop(&mut self) {
        if self.dirty
            && let Err(err) = self.flush()
        {
            tracing::error!(error = %err, "failed to flush packed volume on release");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/single_file.rs"]
mod tests;
