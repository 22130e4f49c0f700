use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "cinema_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn solid(w: u32, h: u32, rgb: [u8; 3]) -> image::RgbImage {
    image::RgbImage::from_pixel(w, h, image::Rgb(rgb))
}

#[test]
fn new_volume_is_zero_filled() {
    let v = Volume::new(2, 3, 4).unwrap();
    assert_eq!(v.slices(), 4);
    let s = v.slice(3).unwrap();
    assert_eq!(s.dimensions(), (2, 3));
    assert!(s.as_raw().iter().all(|&b| b == 0));
    assert!(v.slice(4).is_none());
}

#[test]
fn write_slice_touches_only_its_plane() {
    let mut v = Volume::new(2, 2, 3).unwrap();
    v.write_slice(1, &solid(2, 2, [9, 8, 7])).unwrap();
    assert_eq!(v.slice(1).unwrap(), solid(2, 2, [9, 8, 7]));
    assert_eq!(v.slice(0).unwrap(), solid(2, 2, [0, 0, 0]));
    assert_eq!(v.slice(2).unwrap(), solid(2, 2, [0, 0, 0]));
}

#[test]
fn write_slice_rejects_wrong_dimensions_and_index() {
    let mut v = Volume::new(2, 2, 1).unwrap();
    assert!(matches!(
        v.write_slice(0, &solid(3, 2, [1, 1, 1])),
        Err(CinemaError::Payload(_))
    ));
    assert!(matches!(
        v.write_slice(1, &solid(2, 2, [1, 1, 1])),
        Err(CinemaError::Query(_))
    ));
}

#[test]
fn file_roundtrip_and_direct_offset_reads() {
    let dir = temp_dir("volume_roundtrip");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("data.raw");

    let mut v = Volume::new(4, 2, 5).unwrap();
    v.write_slice(3, &solid(4, 2, [10, 20, 30])).unwrap();
    v.write_to(&path).unwrap();

    let back = Volume::read_from(&path).unwrap();
    assert_eq!(back, v);

    let mut reader = VolumeReader::open(&path).unwrap();
    assert_eq!(reader.dimensions(), (4, 2));
    assert_eq!(reader.slices(), 5);
    assert_eq!(reader.read_slice(3).unwrap(), solid(4, 2, [10, 20, 30]));
    assert_eq!(reader.read_slice(0).unwrap(), solid(4, 2, [0, 0, 0]));
    assert!(reader.read_slice(5).is_err());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn foreign_files_are_rejected() {
    let dir = temp_dir("volume_foreign");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("data.raw");
    std::fs::write(&path, b"NOTAVOLUME_AT_ALL_PADDING").unwrap();
    assert!(matches!(
        VolumeReader::open(&path),
        Err(CinemaError::Payload(_))
    ));
    std::fs::remove_dir_all(&dir).ok();
}
