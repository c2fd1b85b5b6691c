use crate::MalformedGridError;
use crate::grid::{Axis, AxisKind, Grid};
use crate::interpolant::{FieldPoint, Interpolant};

/// Horizontal wind field with eastward (`u`) and northward (`v`) components in m/s.
#[derive(Debug, Clone)]
pub struct WindField {
    interpolant: Interpolant,
}

impl WindField {
    pub fn new(interpolant: Interpolant) -> Result<Self, MalformedGridError> {
        if interpolant.channels() != 2 {
            return Err(MalformedGridError::WindChannels(interpolant.channels()));
        }
        Ok(Self { interpolant })
    }

    pub fn from_grid(grid: Grid) -> Result<Self, MalformedGridError> {
        Self::new(Interpolant::new(grid))
    }

    /// Spatially and temporally constant wind.
    pub fn uniform(u_m_s: f64, v_m_s: f64) -> Result<Self, MalformedGridError> {
        let grid = Grid::new(
            vec![
                Axis::new(AxisKind::Longitude, vec![0.0])?,
                Axis::new(AxisKind::Latitude, vec![0.0])?,
                Axis::new(AxisKind::Height, vec![0.0])?,
            ],
            2,
            vec![u_m_s, v_m_s],
        )?;
        Self::from_grid(grid)
    }

    /// `(u, v)` at the given point.
    pub fn at(&self, point: &FieldPoint) -> (f64, f64) {
        let mut uv = [0.0; 2];
        self.interpolant.sample_into(point, &mut uv);
        (uv[0], uv[1])
    }

    pub fn interpolant(&self) -> &Interpolant {
        &self.interpolant
    }
}
