//! The validated partition and its lookups.

use crate::config::PartitionConfig;
use crate::directory::HostDirectory;
use crate::error::PartitionError;
use smallvec::SmallVec;
use tessel_core::{HostId, Rect, TileInfo};

/// Tolerance for grid alignment checks, in subtile units.
const ALIGN_EPS: f32 = 1e-3;

/// Hosts touched by a rectangle, sorted ascending, without repeats.
pub type HostSet = SmallVec<[HostId; 4]>;

/// One cell of the partition grid.
///
/// Cells are half-open `[origin, origin + extent)` except along the
/// world's far edges, which belong to the last column and row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubTile {
    /// Grid column.
    pub col: u32,
    /// Grid row.
    pub row: u32,
    /// Origin.
    pub origin_x: f32,
    /// Origin.
    pub origin_y: f32,
    /// Extent.
    pub width: f32,
    /// Extent.
    pub height: f32,
    /// Owner.
    pub host: HostId,
    closed_x: bool,
    closed_y: bool,
}

impl SubTile {
    /// The cell as a closed rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin(self.origin_x, self.origin_y, self.width, self.height)
    }

    /// Whether `(x, y)` resolves to this cell.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let max_x = self.origin_x + self.width;
        let max_y = self.origin_y + self.height;
        let in_x = self.origin_x <= x && (x < max_x || (self.closed_x && x <= max_x));
        let in_y = self.origin_y <= y && (y < max_y || (self.closed_y && y <= max_y));
        in_x && in_y
    }

    /// Wire form for the layout broadcast.
    pub fn info(&self) -> TileInfo {
        TileInfo {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            width: self.width,
            height: self.height,
            host: self.host,
        }
    }
}

/// A validated, immutable territory map.
///
/// Lookups are O(1): coordinates are clamped into the world, floored to
/// a grid cell and read from a dense owner table.
#[derive(Clone, Debug)]
pub struct Partition {
    bounds: Rect,
    tile_w: f32,
    tile_h: f32,
    cols: u32,
    rows: u32,
    /// Row-major owner table, `rows * cols` entries.
    owners: Vec<HostId>,
    directory: HostDirectory,
}

impl Partition {
    /// Upper bound on the number of subtiles.
    pub const MAX_CELLS: u64 = 1 << 24;

    /// Validate `config` and build the owner table.
    ///
    /// Rejects overlapping or missing assignments, misaligned or
    /// out-of-world subtiles, unknown hosts and degenerate extents.
    pub fn new(config: PartitionConfig) -> Result<Self, PartitionError> {
        let PartitionConfig {
            bounds,
            subtile_width,
            subtile_height,
            subtiles,
            hosts,
        } = config;

        check_extent("world width", bounds.width())?;
        check_extent("world height", bounds.height())?;
        check_extent("subtile width", subtile_width)?;
        check_extent("subtile height", subtile_height)?;
        let cols = cells_along("x", bounds.width(), subtile_width)?;
        let rows = cells_along("y", bounds.height(), subtile_height)?;
        let cells = cols as u64 * rows as u64;
        if cells > Self::MAX_CELLS {
            return Err(PartitionError::TooManyCells {
                cells,
                max: Self::MAX_CELLS,
            });
        }

        let directory = HostDirectory::new(&hosts)?;
        let mut table: Vec<Option<HostId>> = vec![None; cells as usize];
        for spec in &subtiles {
            if !directory.contains(spec.host) {
                return Err(PartitionError::UnknownHost { host: spec.host });
            }
            let (col, row) = grid_index(&bounds, subtile_width, subtile_height, spec.origin_x, spec.origin_y)?;
            if col < 0 || row < 0 || col >= cols as i64 || row >= rows as i64 {
                return Err(PartitionError::OutOfBounds {
                    x: spec.origin_x,
                    y: spec.origin_y,
                });
            }
            let (col, row) = (col as u32, row as u32);
            let slot = &mut table[(row * cols + col) as usize];
            if let Some(first) = *slot {
                return Err(PartitionError::Overlap {
                    col,
                    row,
                    first,
                    second: spec.host,
                });
            }
            *slot = Some(spec.host);
        }

        let mut owners = Vec::with_capacity(table.len());
        for (i, owner) in table.into_iter().enumerate() {
            match owner {
                Some(host) => owners.push(host),
                None => {
                    let i = i as u32;
                    return Err(PartitionError::Gap {
                        col: i % cols,
                        row: i / cols,
                    });
                }
            }
        }

        tracing::debug!(cols, rows, hosts = directory.len(), "partition validated");
        Ok(Self {
            bounds,
            tile_w: subtile_width,
            tile_h: subtile_height,
            cols,
            rows,
            owners,
            directory,
        })
    }

    /// Total world bounds.
    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    /// Grid dimensions as `(cols, rows)`.
    pub fn dims(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    /// The configured hosts.
    pub fn directory(&self) -> &HostDirectory {
        &self.directory
    }

    /// Grid cell of `(x, y)` after clamping into the world. NaN maps to
    /// the origin side.
    fn cell_of(&self, x: f32, y: f32) -> (u32, u32) {
        let fx = ((x - self.bounds.min_x) / self.tile_w).floor();
        let fy = ((y - self.bounds.min_y) / self.tile_h).floor();
        // Float-to-int casts saturate and send NaN to 0.
        let col = (fx.max(0.0) as u32).min(self.cols - 1);
        let row = (fy.max(0.0) as u32).min(self.rows - 1);
        (col, row)
    }

    fn tile(&self, col: u32, row: u32) -> SubTile {
        SubTile {
            col,
            row,
            origin_x: self.bounds.min_x + col as f32 * self.tile_w,
            origin_y: self.bounds.min_y + row as f32 * self.tile_h,
            width: self.tile_w,
            height: self.tile_h,
            host: self.owners[(row * self.cols + col) as usize],
            closed_x: col + 1 == self.cols,
            closed_y: row + 1 == self.rows,
        }
    }

    /// The host owning `(x, y)`. Total: points outside the world resolve
    /// to the nearest edge cell.
    pub fn owning_host(&self, x: f32, y: f32) -> HostId {
        let (col, row) = self.cell_of(x, y);
        self.owners[(row * self.cols + col) as usize]
    }

    /// The subtile `(x, y)` resolves to.
    pub fn subtile_at(&self, x: f32, y: f32) -> SubTile {
        let (col, row) = self.cell_of(x, y);
        self.tile(col, row)
    }

    fn cell_range(&self, rect: &Rect) -> ((u32, u32), (u32, u32)) {
        let r = rect.clamp_to(&self.bounds);
        (self.cell_of(r.min_x, r.min_y), self.cell_of(r.max_x, r.max_y))
    }

    /// Every host owning a cell the rectangle touches.
    pub fn hosts_in_rect(&self, rect: &Rect) -> HostSet {
        let ((c0, r0), (c1, r1)) = self.cell_range(rect);
        let mut out = HostSet::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                let host = self.owners[(row * self.cols + col) as usize];
                if !out.contains(&host) {
                    out.push(host);
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// Whether the rectangle touches any cell owned by `host`.
    pub fn rect_touches_host(&self, rect: &Rect, host: HostId) -> bool {
        let ((c0, r0), (c1, r1)) = self.cell_range(rect);
        (r0..=r1).any(|row| (c0..=c1).any(|col| self.owners[(row * self.cols + col) as usize] == host))
    }

    /// All subtiles, row-major.
    pub fn subtiles(&self) -> impl Iterator<Item = SubTile> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.tile(col, row)))
    }

    /// The subtiles owned by `host`.
    pub fn territory(&self, host: HostId) -> Vec<SubTile> {
        self.subtiles().filter(|t| t.host == host).collect()
    }

    /// Wire form of the whole layout.
    pub fn tile_infos(&self) -> Vec<TileInfo> {
        self.subtiles().map(|t| t.info()).collect()
    }
}

fn check_extent(name: &str, v: f32) -> Result<(), PartitionError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(PartitionError::InvalidDimensions {
            reason: format!("{name} must be positive and finite, got {v}"),
        })
    }
}

fn cells_along(axis: &'static str, extent: f32, subtile: f32) -> Result<u32, PartitionError> {
    let exact = extent / subtile;
    let n = exact.round();
    if n < 1.0 || (exact - n).abs() > ALIGN_EPS || n > u32::MAX as f32 {
        return Err(PartitionError::NotTessellating {
            axis,
            extent,
            subtile,
        });
    }
    Ok(n as u32)
}

fn grid_index(bounds: &Rect, w: f32, h: f32, x: f32, y: f32) -> Result<(i64, i64), PartitionError> {
    let fx = (x - bounds.min_x) / w;
    let fy = (y - bounds.min_y) / h;
    if !fx.is_finite() || !fy.is_finite() {
        return Err(PartitionError::Misaligned { x, y });
    }
    let (cx, cy) = (fx.round(), fy.round());
    if (fx - cx).abs() > ALIGN_EPS || (fy - cy).abs() > ALIGN_EPS {
        return Err(PartitionError::Misaligned { x, y });
    }
    Ok((cx as i64, cy as i64))
}
