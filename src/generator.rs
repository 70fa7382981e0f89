//! Конвейер генерации мира.
//!
//! Этапы выполняются строго по очереди:
//! 1. поля высоты и влажности;
//! 2. озёра, подмочка берегов, уклоны, сток, реки;
//! 3. биомы с калибровкой скал и формирование плодородных участков;
//! 4. леса, деревья, месторождения, ягодники;
//! 5. расчистка зоны появления.
//!
//! Всё состояние прогона живёт в [`GenerationContext`]: сид, размеры, конфиг и
//! два независимых потока случайных чисел (реки и ресурсы).

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::biome::{BiomeInput, Tile, assign_base_biomes};
use crate::config::{ShadingConfig, TerrainConfig};
use crate::fertile::shape_fertile_patches;
use crate::grid::Dims;
use crate::heightmap::make_height_moisture;
use crate::hillshade::make_hillshade;
use crate::hydrology::{
    River, RiverBasin, RiverExit, WaterMasks, boost_moisture_near_lakes, compute_slope,
    extract_rivers, flood_fill_basins, flow_dir_and_accum, rasterize_rivers,
};
use crate::report::GenerationReport;
use crate::resources::{place_berry_clusters, place_deposits};
use crate::spawn::{ResourceLayers, clear_spawn_area};
use crate::vegetation::{grow_forest_blobs, place_trees, poisson_centers};

const RIVER_SALT: u32 = 0x2545_F491;
const RESOURCE_SALT: u32 = 0x5851_F42D;
const FOREST_SALT: u32 = 0x1B87_3593;

/// Состояние одного прогона генерации
pub struct GenerationContext<'a> {
    pub seed: u32,
    pub dims: Dims,
    pub config: &'a TerrainConfig,
    /// Разрешение ничьих при трассировке рек
    pub river_rng: ChaCha8Rng,
    /// Деревья, камень, ягоды
    pub resource_rng: ChaCha8Rng,
}

impl<'a> GenerationContext<'a> {
    #[must_use]
    pub fn new(seed: u32, config: &'a TerrainConfig, dims: Dims) -> Self {
        Self {
            seed,
            dims,
            config,
            river_rng: ChaCha8Rng::seed_from_u64(u64::from(seed ^ RIVER_SALT)),
            resource_rng: ChaCha8Rng::seed_from_u64(u64::from(seed ^ RESOURCE_SALT)),
        }
    }

    fn forest_seed(&self) -> u64 {
        u64::from(self.seed ^ FOREST_SALT)
    }
}

/// Поля, нужные рендереру и игровой логике, но не входящие в тайловую карту.
///
/// Доступны только на чтение: по ним заново считается отмывка.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuxFields {
    height: Vec<f32>,
    moisture: Vec<f32>,
}

impl AuxFields {
    #[must_use]
    pub fn height(&self) -> &[f32] {
        &self.height
    }

    /// Влажность после подмочки у озёр
    #[must_use]
    pub fn moisture(&self) -> &[f32] {
        &self.moisture
    }
}

/// Готовый мир: тайлы, ресурсы по тайлам и вспомогательные поля
#[derive(Debug, Clone, PartialEq, Default)]
pub struct World {
    pub dims: Dims,
    pub tiles: Vec<Tile>,
    /// Деревья на тайле, 0..=2
    pub trees: Vec<u8>,
    /// Камень на тайле, 0..=3
    pub rocks: Vec<u8>,
    /// Ягоды на тайле, 0..=2
    pub berries: Vec<u8>,
    pub aux: AuxFields,
}

impl World {
    fn empty(dims: Dims) -> Self {
        Self {
            dims,
            ..Self::default()
        }
    }

    /// Отмывка рельефа по полю высот этого мира
    #[must_use]
    pub fn hillshade(&self, cfg: &ShadingConfig) -> Vec<f32> {
        make_hillshade(self.aux.height(), self.dims.w, self.dims.h, cfg)
    }
}

/// Генерирует мир по сиду, конфигурации и размерам.
///
/// Один и тот же `(seed, config, dims)` всегда даёт побитово одинаковый результат.
/// При нулевой ширине или высоте возвращаются пустые массивы.
#[must_use]
pub fn generate_terrain(seed: u32, config: &TerrainConfig, dims: Dims) -> World {
    generate_terrain_with_report(seed, config, dims).0
}

/// То же, что [`generate_terrain`], плюс диагностическая сводка
#[must_use]
pub fn generate_terrain_with_report(
    seed: u32,
    config: &TerrainConfig,
    dims: Dims,
) -> (World, GenerationReport) {
    let mut report = GenerationReport {
        seed,
        width: dims.w,
        height: dims.h,
        ..GenerationReport::default()
    };
    if dims.is_empty() {
        report.tile_counts = GenerationReport::count_tiles(&[]);
        return (World::empty(dims), report);
    }

    let mut ctx = GenerationContext::new(seed, config, dims);
    let cfg = ctx.config;

    // === 1. Поля ===
    let fields = make_height_moisture(seed, dims, cfg);
    let height = fields.height;
    let mut moisture = fields.moisture;

    // === 2. Гидрология ===
    let lakes = flood_fill_basins(
        &height,
        dims,
        cfg.water.level,
        cfg.water.min_lake_size,
        cfg.water.max_lake_size,
    );
    boost_moisture_near_lakes(
        &mut moisture,
        &lakes.mask,
        dims,
        cfg.water.moisture_boost,
        cfg.water.boost_radius,
    );

    let slope = compute_slope(&height, dims);
    let flow = flow_dir_and_accum(&height, dims, seed, cfg.rivers.meander_jitter);

    let basin = RiverBasin {
        dims,
        height: &height,
        flow: &flow,
        lake: &lakes.mask,
    };
    let rivers = extract_rivers(basin, &cfg.rivers, &mut ctx.river_rng);
    let river_mask = rasterize_rivers(&rivers, &flow.accum, dims, &cfg.rivers);

    report.lake_count = lakes.count;
    let masks = WaterMasks::new(lakes.mask, river_mask, dims);

    // === 3. Биомы ===
    let input = BiomeInput {
        dims,
        height: &height,
        moisture: &moisture,
        slope: &slope,
        masks: &masks,
    };
    let biome = assign_base_biomes(&input, &cfg.biome, &cfg.rock);
    let mut tiles = biome.tiles;
    let fertile = shape_fertile_patches(&mut tiles, dims, &cfg.fertile);

    // === 4. Растительность и ресурсы ===
    let centers = poisson_centers(
        dims,
        |x, y| {
            let i = dims.idx(x, y);
            matches!(tiles[i], Tile::Grass | Tile::Meadow)
                && moisture[i] >= cfg.forest.center_moisture
        },
        cfg.forest.spacing,
        ctx.forest_seed(),
    );
    let intensity = grow_forest_blobs(&mut tiles, &moisture, &centers, dims, &cfg.forest);
    let mut trees = place_trees(&tiles, &intensity, dims, &cfg.forest, &mut ctx.resource_rng);
    let mut rocks = place_deposits(&tiles, &slope, dims, &cfg.rock, &mut ctx.resource_rng);
    let mut berries = place_berry_clusters(
        &tiles,
        &trees,
        &rocks,
        dims,
        &cfg.fertile,
        &mut ctx.resource_rng,
    );

    // === 5. Зона появления ===
    if cfg.spawn.enabled {
        let (cx, cy) = dims.center();
        let layers = ResourceLayers {
            trees: &mut trees,
            rocks: &mut rocks,
            berries: &mut berries,
        };
        clear_spawn_area(&mut tiles, layers, dims, cx, cy, cfg.spawn.radius);
    }

    // === Диагностика ===
    let total = dims.len() as f32;
    report.tile_counts = GenerationReport::count_tiles(&tiles);
    report.rock_ratio = biome.rock_ratio;
    report.rock_calibration_iters = biome.iterations;
    report.final_rock_ratio = report.tile_counts["Rock"] as f32 / total;
    report.water_ratio = report.tile_counts["Water"] as f32 / total;
    report.lake_cells = masks.lake.iter().filter(|&&l| l).count();
    report.river_cells = masks.river.iter().filter(|&&r| r).count();
    report.rivers = rivers.len();
    report.rivers_to_lake = rivers.iter().filter(|r| r.exit == RiverExit::Lake).count();
    report.rivers_to_edge = rivers.iter().filter(|r| r.exit == RiverExit::Edge).count();
    report.rivers_terminated = (0..rivers.len())
        .filter(|&k| river_terminates(&rivers[k], &rivers[..k], &masks.lake, dims))
        .count();
    report.fertile = fertile;
    report.forest_centers = centers.len();
    report.tree_total = trees.iter().map(|&t| u64::from(t)).sum();
    report.deposit_cells = rocks.iter().filter(|&&r| r > 0).count();
    report.rock_total = rocks.iter().map(|&r| u64::from(r)).sum();
    report.berry_total = berries.iter().map(|&b| u64::from(b)).sum();

    log::debug!("{}", report.summary());

    let world = World {
        dims,
        tiles,
        trees,
        rocks,
        berries,
        aux: AuxFields { height, moisture },
    };
    (world, report)
}

/// Лежит ли устье реки в озере, на краю карты или на одной из более ранних рек
fn river_terminates(river: &River, earlier: &[River], lake: &[bool], dims: Dims) -> bool {
    let Some(&(px, py)) = river.points.last() else {
        return false;
    };
    let x = (px.round().max(0.0) as usize).min(dims.w - 1);
    let y = (py.round().max(0.0) as usize).min(dims.h - 1);
    if lake[dims.idx(x, y)] || dims.on_edge(x, y) {
        return true;
    }
    // Сглаженная линия отходит от клеток трассы меньше чем на тайл
    earlier.iter().any(|r| {
        r.points
            .iter()
            .any(|&(qx, qy)| (qx - px).abs() <= 1.0 && (qy - py).abs() <= 1.0)
    })
}
