//! Voxel grid shared by the level generator, the physics and projectile
//! engines and the sound propagation model.
//!
//! Cells are stored x-major, then y, then z. The same order is used on the
//! wire, so a `MAP_DATA` payload is just the cell bytes in storage order.

use glam::{IVec3, Vec3};
use thiserror::Error;

/// Contents of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Voxel {
    Air = 0,
    #[default]
    Solid = 1,
}

impl Voxel {
    pub fn is_solid(self) -> bool {
        self == Voxel::Solid
    }
}

impl TryFrom<u8> for Voxel {
    type Error = GridError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Voxel::Air),
            1 => Ok(Voxel::Solid),
            other => Err(GridError::InvalidCell(other)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("invalid voxel value {0}")]
    InvalidCell(u8),

    #[error("grid {width}x{height}x{length} needs {expected} cells, got {actual}")]
    SizeMismatch {
        width: usize,
        height: usize,
        length: usize,
        expected: usize,
        actual: usize,
    },
}

/// Extent of a grid along each axis, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    pub width: usize,
    pub height: usize,
    pub length: usize,
}

impl GridDims {
    pub const fn new(width: usize, height: usize, length: usize) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height * self.length
    }

    pub fn contains(&self, cell: IVec3) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && cell.z >= 0
            && (cell.x as usize) < self.width
            && (cell.y as usize) < self.height
            && (cell.z as usize) < self.length
    }

    /// Storage index of `cell`, or `None` when it lies outside the grid.
    pub fn index(&self, cell: IVec3) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let (x, y, z) = (cell.x as usize, cell.y as usize, cell.z as usize);
        Some((x * self.height + y) * self.length + z)
    }

    /// Inverse of [`GridDims::index`].
    pub fn cell(&self, index: usize) -> IVec3 {
        let z = index % self.length;
        let y = (index / self.length) % self.height;
        let x = index / (self.length * self.height);
        IVec3::new(x as i32, y as i32, z as i32)
    }

    pub fn is_border(&self, cell: IVec3) -> bool {
        cell.x == 0
            || cell.y == 0
            || cell.z == 0
            || cell.x as usize == self.width - 1
            || cell.y as usize == self.height - 1
            || cell.z as usize == self.length - 1
    }
}

/// Fixed-size 3D array of solid and air cells.
///
/// Queries outside the grid answer [`Voxel::Solid`], so callers can probe
/// any integer coordinate without bounds checks of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    dims: GridDims,
    cells: Vec<Voxel>,
}

impl VoxelGrid {
    /// Creates a grid where every cell is solid.
    pub fn solid(dims: GridDims) -> Self {
        Self {
            dims,
            cells: vec![Voxel::Solid; dims.cell_count()],
        }
    }

    /// Rebuilds a grid from its wire representation.
    pub fn from_bytes(dims: GridDims, bytes: &[u8]) -> Result<Self, GridError> {
        if bytes.len() != dims.cell_count() {
            return Err(GridError::SizeMismatch {
                width: dims.width,
                height: dims.height,
                length: dims.length,
                expected: dims.cell_count(),
                actual: bytes.len(),
            });
        }

        let cells = bytes
            .iter()
            .map(|&b| Voxel::try_from(b))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dims, cells })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|&v| v as u8).collect()
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn get(&self, cell: IVec3) -> Voxel {
        self.dims
            .index(cell)
            .map_or(Voxel::Solid, |i| self.cells[i])
    }

    pub fn is_solid(&self, cell: IVec3) -> bool {
        self.get(cell).is_solid()
    }

    pub fn is_air(&self, cell: IVec3) -> bool {
        !self.is_solid(cell)
    }

    /// Writes a cell. Writes outside the grid are ignored.
    pub fn set(&mut self, cell: IVec3, voxel: Voxel) {
        if let Some(i) = self.dims.index(cell) {
            self.cells[i] = voxel;
        }
    }

    /// Clears a cell to air unless it sits on the border.
    ///
    /// Returns true if the cell was solid before the call.
    pub fn carve(&mut self, cell: IVec3) -> bool {
        if !self.dims.contains(cell) || self.dims.is_border(cell) {
            return false;
        }
        let was_solid = self.is_solid(cell);
        self.set(cell, Voxel::Air);
        was_solid
    }

    /// Forces every border cell back to solid.
    pub fn seal_border(&mut self) {
        for i in 0..self.cells.len() {
            if self.dims.is_border(self.dims.cell(i)) {
                self.cells[i] = Voxel::Solid;
            }
        }
    }

    /// Cell containing a world-space point.
    pub fn cell_of(position: Vec3) -> IVec3 {
        position.floor().as_ivec3()
    }

    /// Iterates over every cell coordinate together with its contents.
    pub fn iter(&self) -> impl Iterator<Item = (IVec3, Voxel)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.dims.cell(i), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> GridDims {
        GridDims::new(4, 3, 5)
    }

    #[test]
    fn test_index_roundtrip() {
        let dims = dims();
        for i in 0..dims.cell_count() {
            assert_eq!(dims.index(dims.cell(i)), Some(i));
        }
    }

    #[test]
    fn test_index_is_x_major() {
        let dims = dims();
        assert_eq!(dims.index(IVec3::new(0, 0, 1)), Some(1));
        assert_eq!(dims.index(IVec3::new(0, 1, 0)), Some(5));
        assert_eq!(dims.index(IVec3::new(1, 0, 0)), Some(15));
    }

    #[test]
    fn test_out_of_bounds_reads_as_solid() {
        let mut grid = VoxelGrid::solid(dims());
        grid.carve(IVec3::new(1, 1, 1));

        assert!(grid.is_air(IVec3::new(1, 1, 1)));
        assert!(grid.is_solid(IVec3::new(-1, 1, 1)));
        assert!(grid.is_solid(IVec3::new(1, 3, 1)));
        assert!(grid.is_solid(IVec3::new(1, 1, 99)));
    }

    #[test]
    fn test_carve_never_touches_border() {
        let mut grid = VoxelGrid::solid(dims());
        assert!(!grid.carve(IVec3::new(0, 1, 1)));
        assert!(!grid.carve(IVec3::new(1, 2, 1)));
        assert!(grid.is_solid(IVec3::new(0, 1, 1)));

        assert!(grid.carve(IVec3::new(2, 1, 3)));
        assert!(!grid.carve(IVec3::new(2, 1, 3)));
    }

    #[test]
    fn test_seal_border_restores_invariant() {
        let dims = dims();
        let mut grid = VoxelGrid::from_bytes(dims, &vec![0; dims.cell_count()]).unwrap();
        grid.seal_border();

        for (cell, voxel) in grid.iter() {
            if dims.is_border(cell) {
                assert_eq!(voxel, Voxel::Solid);
            } else {
                assert_eq!(voxel, Voxel::Air);
            }
        }
    }

    #[test]
    fn test_bytes_roundtrip_preserves_cells() {
        let mut grid = VoxelGrid::solid(dims());
        grid.carve(IVec3::new(1, 1, 2));
        grid.carve(IVec3::new(2, 1, 3));

        let rebuilt = VoxelGrid::from_bytes(grid.dims(), &grid.to_bytes()).unwrap();
        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        let dims = dims();
        assert!(matches!(
            VoxelGrid::from_bytes(dims, &[0; 3]),
            Err(GridError::SizeMismatch { actual: 3, .. })
        ));

        let mut bytes = vec![1; dims.cell_count()];
        bytes[7] = 2;
        assert_eq!(
            VoxelGrid::from_bytes(dims, &bytes),
            Err(GridError::InvalidCell(2))
        );
    }

    #[test]
    fn test_cell_of_floors_negative_coordinates() {
        assert_eq!(
            VoxelGrid::cell_of(Vec3::new(-0.5, 1.99, 2.0)),
            IVec3::new(-1, 1, 2)
        );
    }
}
