//! Grid geometry: maps grid cells to geographic extents and splits the grid
//! into work chunks for the worker pool.

use std::ops::Range;

use crate::error::{DemTilesError, Result};
use crate::model::{BoundingBox, GridCell, TileBounds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub bbox: BoundingBox,
    pub divisions: u32,
}

impl GridGeometry {
    pub fn new(bbox: BoundingBox, divisions: u32) -> Result<Self> {
        if divisions == 0 {
            return Err(DemTilesError::InvalidConfig(
                "divisions must be a positive integer".to_string(),
            ));
        }
        Ok(Self { bbox, divisions })
    }

    /// Western edge of grid column `k` (k == divisions is the eastern box edge).
    fn lon_edge(&self, k: u32) -> f64 {
        if k == 0 {
            self.bbox.lon_min
        } else if k >= self.divisions {
            self.bbox.lon_max
        } else {
            self.bbox.lon_min + k as f64 * self.bbox.width() / self.divisions as f64
        }
    }

    /// Northern edge of grid row `k`; rows advance southward.
    fn lat_edge(&self, k: u32) -> f64 {
        if k == 0 {
            self.bbox.lat_max
        } else if k >= self.divisions {
            self.bbox.lat_min
        } else {
            self.bbox.lat_max - k as f64 * self.bbox.height() / self.divisions as f64
        }
    }

    /// Extent of one cell. Neighbouring cells share the exact same edge value.
    pub fn tile_bounds(&self, cell: GridCell) -> TileBounds {
        TileBounds {
            lon_min: self.lon_edge(cell.column),
            lon_max: self.lon_edge(cell.column + 1),
            lat_max: self.lat_edge(cell.row),
            lat_min: self.lat_edge(cell.row + 1),
        }
    }

    pub fn geo_transform(&self, cell: GridCell, tile_size: usize) -> [f64; 6] {
        self.tile_bounds(cell).geo_transform(tile_size)
    }

    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.divisions)
            .flat_map(move |column| (0..self.divisions).map(move |row| GridCell::new(column, row)))
    }

    pub fn cell_count(&self) -> usize {
        (self.divisions as usize) * (self.divisions as usize)
    }
}

/// Splits `0..divisions` into exactly `chunks` contiguous ranges.
///
/// Remainder columns go one each to the leading chunks, so widths differ by
/// at most one and no column is dropped. When there are more chunks than
/// columns the trailing ranges are empty.
pub fn partition_columns(divisions: u32, chunks: usize) -> Result<Vec<Range<u32>>> {
    if divisions == 0 || chunks == 0 {
        return Err(DemTilesError::InvalidConfig(format!(
            "cannot partition {} columns into {} chunks",
            divisions, chunks
        )));
    }

    let chunks = chunks as u32;
    let base = divisions / chunks;
    let remainder = divisions % chunks;

    let mut start = 0;
    Ok((0..chunks)
        .map(|i| {
            let width = base + u32::from(i < remainder);
            let range = start..start + width;
            start += width;
            range
        })
        .collect())
}

/// Deals items into `chunks` buckets: item `k` lands in bucket `k % chunks`.
pub fn round_robin<T>(items: impl IntoIterator<Item = T>, chunks: usize) -> Vec<Vec<T>> {
    let chunks = chunks.max(1);
    let mut buckets: Vec<Vec<T>> = (0..chunks).map(|_| Vec::new()).collect();
    for (k, item) in items.into_iter().enumerate() {
        buckets[k % chunks].push(item);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn santa_cruz_grid() -> GridGeometry {
        GridGeometry::new(BoundingBox::santa_cruz(), 10).unwrap()
    }

    #[test]
    fn test_boundary_cells_reproduce_bbox_edges() {
        let grid = santa_cruz_grid();
        let bbox = grid.bbox;

        let nw = grid.tile_bounds(GridCell::new(0, 0));
        assert_eq!(nw.lon_min, bbox.lon_min);
        assert_eq!(nw.lat_max, bbox.lat_max);

        let se = grid.tile_bounds(GridCell::new(9, 9));
        assert_eq!(se.lon_max, bbox.lon_max);
        assert_eq!(se.lat_min, bbox.lat_min);
    }

    #[test]
    fn test_cells_tile_bbox_without_gaps_or_overlaps() {
        let grid = santa_cruz_grid();
        let d = grid.divisions;
        let mut area = 0.0;

        for cell in grid.cells() {
            let b = grid.tile_bounds(cell);
            assert!(b.lon_min < b.lon_max, "degenerate lon span at {:?}", cell);
            assert!(b.lat_min < b.lat_max, "degenerate lat span at {:?}", cell);
            area += (b.lon_max - b.lon_min) * (b.lat_max - b.lat_min);

            if cell.column + 1 < d {
                let east = grid.tile_bounds(GridCell::new(cell.column + 1, cell.row));
                assert_eq!(b.lon_max, east.lon_min, "seam gap east of {:?}", cell);
                assert_eq!(b.lat_max, east.lat_max);
                assert_eq!(b.lat_min, east.lat_min);
            }
            if cell.row + 1 < d {
                let south = grid.tile_bounds(GridCell::new(cell.column, cell.row + 1));
                assert_eq!(b.lat_min, south.lat_max, "seam gap south of {:?}", cell);
                assert_eq!(b.lon_min, south.lon_min);
                assert_eq!(b.lon_max, south.lon_max);
            }
        }

        let expected = grid.bbox.width() * grid.bbox.height();
        assert!((area - expected).abs() < 1e-12, "area {} vs {}", area, expected);
        assert_eq!(grid.cells().count(), 100);
    }

    #[test]
    fn test_row_increases_southward() {
        let grid = santa_cruz_grid();
        let north = grid.tile_bounds(GridCell::new(3, 0));
        let south = grid.tile_bounds(GridCell::new(3, 1));
        assert!(south.lat_max < north.lat_max);

        let west = grid.tile_bounds(GridCell::new(0, 3));
        let east = grid.tile_bounds(GridCell::new(1, 3));
        assert!(east.lon_min > west.lon_min);
    }

    #[test]
    fn test_geo_transform_matches_tile_span() {
        let grid = santa_cruz_grid();
        let cell = GridCell::new(2, 5);
        let b = grid.tile_bounds(cell);
        let gt = grid.geo_transform(cell, 256);

        assert_eq!(gt[0], b.lon_min);
        assert_eq!(gt[3], b.lat_max);
        assert!((gt[1] * 256.0 - (b.lon_max - b.lon_min)).abs() < 1e-15);
        assert!(gt[5] < 0.0);
        assert_eq!(gt[2], 0.0);
        assert_eq!(gt[4], 0.0);
    }

    #[test]
    fn test_partition_columns_even_split() {
        let chunks = partition_columns(12, 4).unwrap();
        assert_eq!(chunks, vec![0..3, 3..6, 6..9, 9..12]);

        let covered: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(covered, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_columns_spreads_remainder() {
        // 10 columns over 4 workers: columns 8 and 9 must not be dropped.
        let chunks = partition_columns(10, 4).unwrap();
        assert_eq!(chunks, vec![0..3, 3..6, 6..8, 8..10]);

        let covered: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(covered, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_columns_edge_cases() {
        assert!(matches!(
            partition_columns(0, 4),
            Err(DemTilesError::InvalidConfig(_))
        ));
        assert!(partition_columns(10, 0).is_err());

        let chunks = partition_columns(2, 4).unwrap();
        assert_eq!(chunks, vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn test_round_robin_assignment() {
        let dirs = vec!["a", "b", "c", "d", "e", "f"];
        let chunks = round_robin(dirs, 4);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], vec!["a", "e"]);
        assert_eq!(chunks[1], vec!["b", "f"]);
        assert_eq!(chunks[2], vec!["c"]);
        assert_eq!(chunks[3], vec!["d"]);

        let sparse = round_robin(vec![1], 4);
        assert_eq!(sparse.len(), 4);
        assert!(sparse[1].is_empty());
    }
}
