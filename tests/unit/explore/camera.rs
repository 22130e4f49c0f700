use super::*;
use crate::descriptor;

fn close(a: [f64; 3], b: [f64; 3]) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}

#[test]
fn pose_at_zero_angles_looks_along_x() {
    let cam = OrbitCamera::new([1.0, 2.0, 3.0], 10.0, |_: &CameraPose| Ok(()));
    let pose = cam.pose(0.0, 0.0);
    assert!(close(pose.position, [-9.0, 2.0, 3.0]));
    assert!(close(pose.view_up, [0.0, 0.0, 1.0]));
    assert_eq!(pose.focal_point, [1.0, 2.0, 3.0]);
}

#[test]
fn pose_at_pole_elevation_sits_above_center() {
    let cam = OrbitCamera::new([0.0, 0.0, 0.0], 2.0, |_: &CameraPose| Ok(()));
    let pose = cam.pose(90.0, 0.0);
    assert!(close(pose.position, [0.0, 0.0, 2.0]));
}

#[test]
fn execute_feeds_sink_from_descriptor() {
    let mut seen = Vec::new();
    {
        let mut cam = OrbitCamera::new([0.0; 3], 1.0, |p: &CameraPose| {
            seen.push(*p);
            Ok(())
        });
        let mut doc = Document::new(descriptor([("theta", 0), ("phi", 90)]));
        cam.execute(&mut doc).unwrap();
    }
    assert_eq!(seen.len(), 1);
    assert!(close(seen[0].position, [0.0, 1.0, 0.0]));
}

#[test]
fn execute_requires_numeric_angles() {
    let mut cam = OrbitCamera::new([0.0; 3], 1.0, |_: &CameraPose| Ok(()));
    let mut doc = Document::new(descriptor([("theta", "up")]));
    assert!(matches!(cam.execute(&mut doc), Err(CinemaError::Query(_))));
}

#[test]
fn orbit_angles_stay_off_the_poles() {
    let (thetas, phis) = orbit_angles(10, 15).unwrap();
    assert_eq!(thetas.first(), Some(&-75));
    assert_eq!(thetas.last(), Some(&75));
    assert_eq!(thetas.len(), 11);
    assert_eq!(phis.len(), 36);

    let (thetas, _) = orbit_angles(90, 20).unwrap();
    assert_eq!(thetas, vec![-80, -60, -40, -20, 0, 20, 40, 60, 80]);

    assert!(orbit_angles(0, 10).is_err());
}
