//! Simulation cell conversion

use glam::DVec3;

/// Unit cell as `[a, b, c, alpha, beta, gamma]`; lengths in the stream's unit,
/// angles in degrees.
pub type Dimensions = [f32; 6];

/// Convert three cell vectors into `[a, b, c, alpha, beta, gamma]`.
///
/// Returns all zeros when the vectors do not describe a valid cell (a zero-length
/// edge, or angles that cannot close a parallelepiped).
pub fn triclinic_box(x: [f32; 3], y: [f32; 3], z: [f32; 3]) -> Dimensions {
    let [x, y, z] = [x, y, z].map(|v| DVec3::from(v.map(f64::from)));

    let (lx, ly, lz) = (x.length(), y.length(), z.length());
    if lx <= 0.0 || ly <= 0.0 || lz <= 0.0 || !(lx.is_finite() && ly.is_finite() && lz.is_finite())
    {
        return [0.0; 6];
    }

    let angle = |u: DVec3, v: DVec3, lu: f64, lv: f64| {
        (u.dot(v) / (lu * lv)).clamp(-1.0, 1.0).acos().to_degrees()
    };
    let alpha = angle(y, z, ly, lz);
    let beta = angle(x, z, lx, lz);
    let gamma = angle(x, y, lx, ly);

    let closes = alpha > 0.0
        && beta > 0.0
        && gamma > 0.0
        && alpha < 180.0
        && beta < 180.0
        && gamma < 180.0
        && alpha + beta + gamma < 360.0
        && alpha + beta > gamma
        && alpha + gamma > beta
        && beta + gamma > alpha;
    if !closes {
        return [0.0; 6];
    }

    [lx as f32, ly as f32, lz as f32, alpha as f32, beta as f32, gamma as f32]
}
