//! Формирование плодородных участков.
//!
//! Связные (4-связность) области `Fertile` подгоняются под `[area_min, area_max]`:
//! мелкие возвращаются в траву, крупные обтачиваются по контуру слой за слоем,
//! затем края скругляются.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::biome::Tile;
use crate::config::FertileSettings;
use crate::grid::{DIRS4, DIRS8, Dims};

/// Клетка края сохраняется, если в её участке не меньше стольких из 8 соседей
const FEATHER_MIN_NEIGHBORS: usize = 5;

/// Сводка по плодородным участкам после формирования
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FertileStats {
    pub count: usize,
    pub total_area: usize,
    pub max_area: usize,
}

/// Находит 4-связные области тайлов `Fertile` (BFS)
#[must_use]
pub fn fertile_regions(tiles: &[Tile], dims: Dims) -> Vec<Vec<usize>> {
    let total = dims.len();
    let mut seen = vec![false; total];
    let mut regions = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..total.min(tiles.len()) {
        if seen[start] || tiles[start] != Tile::Fertile {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);
        let mut region = Vec::new();

        while let Some(i) = queue.pop_front() {
            region.push(i);
            let (x, y) = dims.xy(i);
            for &(dx, dy) in &DIRS4 {
                if let Some(n) = dims.offset(x, y, dx, dy) {
                    if !seen[n] && tiles[n] == Tile::Fertile {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        regions.push(region);
    }

    regions
}

/// Подгоняет плодородные участки под заданные площади и скругляет их края
pub fn shape_fertile_patches(tiles: &mut [Tile], dims: Dims, cfg: &FertileSettings) -> FertileStats {
    if tiles.len() != dims.len() {
        return FertileStats::default();
    }
    let area_max = cfg.area_max.max(1);

    let mut member = vec![false; tiles.len()];
    for region in fertile_regions(tiles, dims) {
        if region.len() < cfg.area_min {
            revert(tiles, &region);
            continue;
        }

        for &i in &region {
            member[i] = true;
        }
        let mut remaining = region.len();

        while remaining > area_max {
            let boundary = boundary_cells(&region, &member, dims, |n| !member[n]);
            if boundary.is_empty() {
                break;
            }
            for &i in &boundary {
                member[i] = false;
                tiles[i] = Tile::Grass;
            }
            remaining -= boundary.len();
        }

        for _ in 0..cfg.edge_feather {
            let ragged = region
                .iter()
                .copied()
                .filter(|&i| member[i] && in_region_neighbors(i, &member, dims) < FEATHER_MIN_NEIGHBORS)
                .collect::<Vec<_>>();
            if ragged.is_empty() {
                break;
            }
            for &i in &ragged {
                member[i] = false;
                tiles[i] = Tile::Grass;
            }
        }

        for &i in &region {
            member[i] = false;
        }
    }

    // Обтачивание может расколоть участок; осколки меньше минимума убираем
    let mut stats = FertileStats::default();
    for region in fertile_regions(tiles, dims) {
        if region.len() < cfg.area_min {
            revert(tiles, &region);
            continue;
        }
        stats.count += 1;
        stats.total_area += region.len();
        stats.max_area = stats.max_area.max(region.len());
    }

    log::debug!(
        "fertile: {} patches, {} tiles, largest {}",
        stats.count,
        stats.total_area,
        stats.max_area
    );
    stats
}

fn revert(tiles: &mut [Tile], region: &[usize]) {
    for &i in region {
        tiles[i] = Tile::Grass;
    }
}

/// Клетки участка, у которых хотя бы один 4-сосед снаружи (или за краем карты)
fn boundary_cells(
    region: &[usize],
    member: &[bool],
    dims: Dims,
    outside: impl Fn(usize) -> bool,
) -> Vec<usize> {
    region
        .iter()
        .copied()
        .filter(|&i| member[i])
        .filter(|&i| {
            let (x, y) = dims.xy(i);
            DIRS4
                .iter()
                .any(|&(dx, dy)| dims.offset(x, y, dx, dy).is_none_or(&outside))
        })
        .collect()
}

fn in_region_neighbors(i: usize, member: &[bool], dims: Dims) -> usize {
    let (x, y) = dims.xy(i);
    DIRS8
        .iter()
        .filter_map(|&(dx, dy)| dims.offset(x, y, dx, dy))
        .filter(|&n| member[n])
        .count()
}
