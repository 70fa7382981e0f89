//! Леса и деревья.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::biome::Tile;
use crate::config::ForestSettings;
use crate::grid::Dims;

const DENSE_INTENSITY: f32 = 0.75;
const THICK_INTENSITY: f32 = 0.55;
/// Спад «силы опушки» на тайл расстояния
const EDGE_FALLOFF: f32 = 0.25;
const EDGE_REACH: i32 = 2;

/// Приближённая выборка с синим шумом.
///
/// Все клетки перемешиваются сидом и просматриваются по очереди; клетка
/// принимается, если проходит маску и лежит дальше `spacing` от всех принятых.
pub fn poisson_centers(
    dims: Dims,
    mask: impl Fn(usize, usize) -> bool,
    spacing: f32,
    seed: u64,
) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..dims.len()).collect();
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let spacing_sq = spacing * spacing;
    let mut centers: Vec<(usize, usize)> = Vec::new();
    for i in order {
        let (x, y) = dims.xy(i);
        if !mask(x, y) {
            continue;
        }
        let free = centers.iter().all(|&(cx, cy)| {
            let dx = cx as f32 - x as f32;
            let dy = cy as f32 - y as f32;
            dx * dx + dy * dy > spacing_sq
        });
        if free {
            centers.push((x, y));
        }
    }
    centers
}

fn blocks_forest(tile: Tile) -> bool {
    matches!(
        tile,
        Tile::Water | Tile::Rock | Tile::Sand | Tile::Snow | Tile::Fertile
    )
}

/// Растит гауссовы пятна леса вокруг центров.
///
/// Интенсивность `exp(-d² / 2σ²)`, `σ = 0.6 · radius`; при перекрытии берётся
/// максимум. Клетки с интенсивностью выше `threshold` становятся `Forest`.
/// Возвращает поле интенсивности.
pub fn grow_forest_blobs(
    tiles: &mut [Tile],
    moisture: &[f32],
    centers: &[(usize, usize)],
    dims: Dims,
    cfg: &ForestSettings,
) -> Vec<f32> {
    let total = dims.len();
    let mut intensity = vec![0.0f32; total];
    if tiles.len() != total || moisture.len() != total {
        return intensity;
    }

    let radius = cfg.radius.max(0.0);
    let reach = radius.ceil() as i32;
    let two_sigma_sq = 2.0 * (0.6 * radius).powi(2).max(f32::EPSILON);

    for &(cx, cy) in centers {
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d_sq = (dx * dx + dy * dy) as f32;
                if d_sq > radius * radius {
                    continue;
                }
                let Some(n) = dims.offset(cx, cy, dx, dy) else {
                    continue;
                };
                if blocks_forest(tiles[n]) || moisture[n] < cfg.min_moisture {
                    continue;
                }
                let value = (-d_sq / two_sigma_sq).exp();
                intensity[n] = intensity[n].max(value);
            }
        }
    }

    for (tile, &v) in tiles.iter_mut().zip(&intensity) {
        if v > cfg.threshold && !blocks_forest(*tile) {
            *tile = Tile::Forest;
        }
    }
    intensity
}

/// Расставляет деревья: 1–2 на тайлах леса и одиночные на опушке.
///
/// Вокруг леса считается «сила опушки» (интенсивность минус 0.25 на тайл в окне
/// 5×5); трава и луг получают дерево с вероятностью, пропорциональной ей.
pub fn place_trees<R: Rng>(
    tiles: &[Tile],
    intensity: &[f32],
    dims: Dims,
    cfg: &ForestSettings,
    rng: &mut R,
) -> Vec<u8> {
    let total = dims.len();
    let mut trees = vec![0u8; total];
    if tiles.len() != total || intensity.len() != total {
        return trees;
    }

    let mut edge = vec![0.0f32; total];
    for i in 0..total {
        if tiles[i] != Tile::Forest {
            continue;
        }
        let v = intensity[i];
        trees[i] = if v > DENSE_INTENSITY || (v > THICK_INTENSITY && rng.gen_bool(0.5)) {
            2
        } else {
            1
        };

        let (x, y) = dims.xy(i);
        for dy in -EDGE_REACH..=EDGE_REACH {
            for dx in -EDGE_REACH..=EDGE_REACH {
                let Some(n) = dims.offset(x, y, dx, dy) else {
                    continue;
                };
                if tiles[n] == Tile::Forest {
                    continue;
                }
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                edge[n] = edge[n].max(v - d * EDGE_FALLOFF);
            }
        }
    }

    for i in 0..total {
        let strength = edge[i];
        if strength <= 0.0 || !matches!(tiles[i], Tile::Grass | Tile::Meadow) {
            continue;
        }
        let p = (strength * cfg.fringe_chance).clamp(0.0, 1.0);
        if rng.gen_bool(f64::from(p)) {
            trees[i] = 1;
        }
    }

    trees
}
