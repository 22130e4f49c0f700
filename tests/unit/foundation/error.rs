use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(CinemaError::schema("x").to_string().contains("schema error:"));
    assert!(
        CinemaError::illegal_state("x")
            .to_string()
            .contains("illegal state:")
    );
    assert!(CinemaError::query("x").to_string().contains("query error:"));
    assert!(
        CinemaError::payload("x")
            .to_string()
            .contains("payload error:")
    );
    assert!(
        CinemaError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CinemaError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn traversal_keeps_track_error_as_source() {
    use std::error::Error as _;

    let err = CinemaError::traversal("{phi: 10}", CinemaError::payload("render failed"));
    assert!(err.to_string().contains("{phi: 10}"));
    let src = err.source().unwrap();
    assert!(src.to_string().contains("render failed"));
}

#[test]
fn json_errors_map_to_serde_variant() {
    let err: CinemaError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, CinemaError::Serde(_)));
}
