use crate::explore::track::Track;
use crate::foundation::error::{CinemaError, CinemaResult};
use crate::store::document::Document;

/// Camera placement produced for one descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// Eye position.
    pub position: [f64; 3],
    /// View-up vector.
    pub view_up: [f64; 3],
    /// Point looked at.
    pub focal_point: [f64; 3],
}

/// Spherical orbit camera driven by the `theta` (elevation) and `phi` (azimuth) parameters,
/// both in degrees.
///
/// The pose is handed to `sink`, which applies it to whatever renders the view.
pub struct OrbitCamera<F> {
    center: [f64; 3],
    distance: f64,
    sink: F,
}

impl<F> OrbitCamera<F>
where
    F: FnMut(&CameraPose) -> CinemaResult<()>,
{
    /// Orbit `center` at `distance`.
    pub fn new(center: [f64; 3], distance: f64, sink: F) -> Self {
        Self {
            center,
            distance,
            sink,
        }
    }

    /// Pose for the given angles in degrees.
    pub fn pose(&self, theta_deg: f64, phi_deg: f64) -> CameraPose {
        let theta = theta_deg.to_radians();
        let phi = phi_deg.to_radians();
        let [cx, cy, cz] = self.center;
        let d = self.distance;
        CameraPose {
            position: [
                cx - phi.cos() * d * theta.cos(),
                cy + phi.sin() * d * theta.cos(),
                cz + theta.sin() * d,
            ],
            view_up: [
                phi.cos() * theta.sin(),
                -phi.sin() * theta.sin(),
                theta.cos(),
            ],
            focal_point: self.center,
        }
    }
}

/// Theta and phi domains for an orbit sampled every `phi_step` / `theta_step` degrees.
///
/// Phi covers `[0, 360)`. Theta stays strictly inside the poles: it starts `90 % theta_step`
/// degrees above -90 (a full step when that is 0) and stops symmetrically below 90.
pub fn orbit_angles(phi_step: u32, theta_step: u32) -> CinemaResult<(Vec<i64>, Vec<i64>)> {
    if phi_step == 0 || theta_step == 0 {
        return Err(CinemaError::schema("orbit angle steps must be > 0"));
    }
    let step = i64::from(theta_step);
    let offset = match 90 % step {
        0 => step,
        r => r,
    };
    let thetas: Vec<i64> = (-90 + offset..=90 - offset)
        .step_by(theta_step as usize)
        .collect();
    let phis: Vec<i64> = (0..360).step_by(phi_step as usize).collect();
    Ok((thetas, phis))
}

fn numeric(document: &Document, name: &str) -> CinemaResult<f64> {
    document
        .descriptor()
        .get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| CinemaError::query(format!("descriptor lacks a numeric '{name}'")))
}

impl<F> Track for OrbitCamera<F>
where
    F: FnMut(&CameraPose) -> CinemaResult<()>,
{
    fn execute(&mut self, document: &mut Document) -> CinemaResult<()> {
        let pose = self.pose(numeric(document, "theta")?, numeric(document, "phi")?);
        (self.sink)(&pose)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/explore/camera.rs"]
mod tests;
