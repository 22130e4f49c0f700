use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{CinemaError, CinemaResult};

const MAGIC: &[u8; 8] = b"CINEMAV1";
const HEADER_LEN: u64 = 8 + 4 * 3;

/// Packed RGB8 volume: `slices` planes of `width × height` pixels, slice-major.
///
/// On disk: the 8-byte magic `CINEMAV1`, little-endian `u32` width, height and slice count,
/// then the raw planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Volume {
    width: u32,
    height: u32,
    slices: usize,
    data: Vec<u8>,
}

impl Volume {
    /// Zero-filled volume.
    pub fn new(width: u32, height: u32, slices: usize) -> CinemaResult<Self> {
        let len = plane_len(width, height)?
            .checked_mul(slices)
            .ok_or_else(|| CinemaError::payload("volume size overflows memory"))?;
        Ok(Self {
            width,
            height,
            slices,
            data: vec![0; len],
        })
    }

    /// Plane width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Plane height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of planes.
    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Copy plane `index` out of the volume.
    pub fn slice(&self, index: usize) -> Option<image::RgbImage> {
        if index >= self.slices {
            return None;
        }
        let len = self.data.len() / self.slices;
        let start = index * len;
        image::RgbImage::from_raw(self.width, self.height, self.data[start..start + len].to_vec())
    }

    /// Overwrite plane `index` with `plane`.
    pub fn write_slice(&mut self, index: usize, plane: &image::RgbImage) -> CinemaResult<()> {
        if plane.dimensions() != (self.width, self.height) {
            return Err(CinemaError::payload(format!(
                "payload is {}x{}, volume planes are {}x{}",
                plane.width(),
                plane.height(),
                self.width,
                self.height
            )));
        }
        if index >= self.slices {
            return Err(CinemaError::query(format!(
                "slice {index} is outside a volume of {} slices",
                self.slices
            )));
        }
        let len = self.data.len() / self.slices;
        let start = index * len;
        self.data[start..start + len].copy_from_slice(plane.as_raw());
        Ok(())
    }

    /// Read a whole volume file into memory.
    pub fn read_from(path: &Path) -> CinemaResult<Self> {
        let mut reader = VolumeReader::open(path)?;
        let mut out = Self::new(reader.width, reader.height, reader.slices)?;
        reader
            .file
            .read_exact(&mut out.data)
            .with_context(|| format!("read volume data '{}'", path.display()))?;
        Ok(out)
    }

    /// Write the volume to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> CinemaResult<()> {
        let slices = u32::try_from(self.slices)
            .map_err(|_| CinemaError::payload("volume has too many slices for the file header"))?;
        let file = File::create(path)
            .with_context(|| format!("create volume file '{}'", path.display()))?;
        let mut w = BufWriter::new(file);
        let write = |w: &mut BufWriter<File>| -> std::io::Result<()> {
            w.write_all(MAGIC)?;
            w.write_all(&self.width.to_le_bytes())?;
            w.write_all(&self.height.to_le_bytes())?;
            w.write_all(&slices.to_le_bytes())?;
            w.write_all(&self.data)?;
            w.flush()
        };
        write(&mut w).with_context(|| format!("write volume file '{}'", path.display()))?;
        Ok(())
    }
}

/// Direct-offset access to planes of a volume file without loading it.
pub struct VolumeReader {
    file: BufReader<File>,
    width: u32,
    height: u32,
    slices: usize,
}

impl VolumeReader {
    /// Open `path` and validate its header.
    pub fn open(path: &Path) -> CinemaResult<Self> {
        let file =
            File::open(path).with_context(|| format!("open volume file '{}'", path.display()))?;
        let mut file = BufReader::new(file);
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)
            .with_context(|| format!("read volume header '{}'", path.display()))?;
        if &header[..8] != MAGIC {
            return Err(CinemaError::payload(format!(
                "'{}' is not a packed volume file",
                path.display()
            )));
        }
        let word = |i: usize| {
            u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]])
        };
        Ok(Self {
            file,
            width: word(8),
            height: word(12),
            slices: word(16) as usize,
        })
    }

    /// Plane dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of planes.
    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Seek to and read plane `index`.
    pub fn read_slice(&mut self, index: usize) -> CinemaResult<image::RgbImage> {
        if index >= self.slices {
            return Err(CinemaError::query(format!(
                "slice {index} is outside a volume of {} slices",
                self.slices
            )));
        }
        let len = plane_len(self.width, self.height)?;
        let offset = HEADER_LEN + (index as u64) * (len as u64);
        let mut buf = vec![0u8; len];
        self.file
            .seek(SeekFrom::Start(offset))
            .context("seek volume slice")?;
        self.file
            .read_exact(&mut buf)
            .context("read volume slice")?;
        image::RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| CinemaError::payload("volume slice has the wrong length"))
    }
}

fn plane_len(width: u32, height: u32) -> CinemaResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| CinemaError::payload("volume plane size overflows memory"))
}

#[cfg(test)]
#[path = "../../tests/unit/store/volume.rs"]
mod tests;
