//! Диагностика сгенерированного мира.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::biome::Tile;
use crate::fertile::FertileStats;

/// Сводка по одному прогону генерации.
///
/// Заполняется в `generate_terrain_with_report`; в CLI пишется как JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub seed: u32,
    pub width: usize,
    pub height: usize,
    /// Число тайлов каждого типа в финальной карте
    pub tile_counts: BTreeMap<String, usize>,
    /// Доля скал сразу после классификации
    pub rock_ratio: f32,
    pub rock_calibration_iters: usize,
    /// Доля скал после всех этапов (расчистка спавна может её снизить)
    pub final_rock_ratio: f32,
    pub lake_cells: usize,
    pub lake_count: usize,
    pub rivers: usize,
    pub river_cells: usize,
    pub rivers_to_lake: usize,
    pub rivers_to_edge: usize,
    /// Рек, чья последняя точка лежит в озере, на краю или на другой реке
    pub rivers_terminated: usize,
    pub fertile: FertileStats,
    pub forest_centers: usize,
    pub tree_total: u64,
    pub deposit_cells: usize,
    pub rock_total: u64,
    pub berry_total: u64,
    pub water_ratio: f32,
}

impl GenerationReport {
    /// Подсчитывает тайлы по типам; типы без единого тайла тоже попадают в таблицу
    #[must_use]
    pub fn count_tiles(tiles: &[Tile]) -> BTreeMap<String, usize> {
        let mut counts = [0usize; Tile::ALL.len()];
        for &t in tiles {
            counts[t.as_u8() as usize] += 1;
        }
        Tile::ALL
            .iter()
            .map(|t| (format!("{t:?}"), counts[t.as_u8() as usize]))
            .collect()
    }

    /// Все ли реки упираются в озеро, край карты или другую реку
    #[must_use]
    pub fn all_rivers_terminated(&self) -> bool {
        self.rivers_terminated == self.rivers
    }

    /// Однострочная сводка для лога
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "seed {} {}x{}: rock {:.3} ({} iters, final {:.3}), water {:.3}, \
             {} lakes / {} cells, {} rivers ({} lake, {} edge, {} terminated), \
             {} fertile patches / {} cells, {} forests / {} trees, \
             {} deposits / {} stone, {} berries",
            self.seed,
            self.width,
            self.height,
            self.rock_ratio,
            self.rock_calibration_iters,
            self.final_rock_ratio,
            self.water_ratio,
            self.lake_count,
            self.lake_cells,
            self.rivers,
            self.rivers_to_lake,
            self.rivers_to_edge,
            self.rivers_terminated,
            self.fertile.count,
            self.fertile.total_area,
            self.forest_centers,
            self.tree_total,
            self.deposit_cells,
            self.rock_total,
            self.berry_total,
        )
    }
}
