//! Месторождения камня и ягодники.

use rand::Rng;

use crate::biome::Tile;
use crate::config::{FertileSettings, RockSettings};
use crate::grid::{DIRS4, DIRS8, Dims};

const MAX_ROCKS: u8 = 3;
const MAX_BERRIES: u8 = 2;
const RICH_DEPOSIT_CHANCE: f64 = 0.45;
/// Досыпка не ставит месторождение ближе этого радиуса к уже существующему
const GUARD_RADIUS: i32 = 2;

/// Расставляет месторождения камня на тайлах `Rock`.
///
/// Каждый тайл скалы независимо получает месторождение с вероятностью
/// `p_on_rock` (2 единицы, с шансом 45% — 3). Месторождение с шансом
/// `blob_chance` добавляет единицу одной соседней скале. Если месторождений
/// меньше `ensure_min_deposits`, оставшиеся скалы досыпаются по убыванию уклона
/// (при равенстве — по возрастанию индекса).
pub fn place_deposits<R: Rng>(
    tiles: &[Tile],
    slope: &[f32],
    dims: Dims,
    cfg: &RockSettings,
    rng: &mut R,
) -> Vec<u8> {
    let total = dims.len();
    let mut rocks = vec![0u8; total];
    if tiles.len() != total || slope.len() != total {
        return rocks;
    }

    let p_on_rock = f64::from(cfg.p_on_rock.clamp(0.0, 1.0));
    let blob_chance = f64::from(cfg.blob_chance.clamp(0.0, 1.0));

    for i in 0..total {
        if tiles[i] != Tile::Rock || !rng.gen_bool(p_on_rock) {
            continue;
        }
        let amount = if rng.gen_bool(RICH_DEPOSIT_CHANCE) { 3 } else { 2 };
        rocks[i] = rocks[i].max(amount);

        if rng.gen_bool(blob_chance) {
            let (x, y) = dims.xy(i);
            let neighbors: Vec<usize> = DIRS4
                .iter()
                .filter_map(|&(dx, dy)| dims.offset(x, y, dx, dy))
                .filter(|&n| tiles[n] == Tile::Rock)
                .collect();
            if !neighbors.is_empty() {
                let n = neighbors[rng.gen_range(0..neighbors.len())];
                rocks[n] = (rocks[n] + 1).min(MAX_ROCKS);
            }
        }
    }

    let mut placed = rocks.iter().filter(|&&r| r > 0).count();
    if placed < cfg.ensure_min_deposits {
        let mut backfill: Vec<usize> = (0..total)
            .filter(|&i| tiles[i] == Tile::Rock && rocks[i] == 0)
            .collect();
        backfill.sort_by(|&a, &b| slope[b].total_cmp(&slope[a]).then(a.cmp(&b)));

        for i in backfill {
            if placed >= cfg.ensure_min_deposits {
                break;
            }
            if has_deposit_nearby(&rocks, i, dims) {
                continue;
            }
            rocks[i] = 2;
            placed += 1;
        }
    }

    log::debug!("deposits: {placed} rock cells with stone");
    rocks
}

fn has_deposit_nearby(rocks: &[u8], i: usize, dims: Dims) -> bool {
    let (x, y) = dims.xy(i);
    for dy in -GUARD_RADIUS..=GUARD_RADIUS {
        for dx in -GUARD_RADIUS..=GUARD_RADIUS {
            if dx * dx + dy * dy > GUARD_RADIUS * GUARD_RADIUS {
                continue;
            }
            if dims.offset(x, y, dx, dy).is_some_and(|n| rocks[n] > 0) {
                return true;
            }
        }
    }
    false
}

fn fertile_neighbors(tiles: &[Tile], i: usize, dims: Dims) -> usize {
    let (x, y) = dims.xy(i);
    DIRS8
        .iter()
        .filter_map(|&(dx, dy)| dims.offset(x, y, dx, dy))
        .filter(|&n| tiles[n] == Tile::Fertile)
        .count()
}

fn bears_berries(tile: Tile) -> bool {
    matches!(tile, Tile::Fertile | Tile::Grass | Tile::Meadow)
}

/// Расставляет ягодные кусты гнёздами.
///
/// Кандидаты в центры — `Fertile` (вес 2) и соседствующие с ним трава/луг
/// (вес 1); к весу прибавляется плотность плодородных соседей и случайное
/// дрожание. Центры выбираются жадно с разносом `2 · cluster_radius`, их число —
/// `round(area / 1000 · cluster_centers_per_1k)`. Вокруг центра куст ставится с
/// вероятностью по Гауссу; на `Fertile` добавляется ещё одна единица.
pub fn place_berry_clusters<R: Rng>(
    tiles: &[Tile],
    trees: &[u8],
    rocks: &[u8],
    dims: Dims,
    cfg: &FertileSettings,
    rng: &mut R,
) -> Vec<u8> {
    let total = dims.len();
    let mut berries = vec![0u8; total];
    if tiles.len() != total || trees.len() != total || rocks.len() != total {
        return berries;
    }

    let mut candidates: Vec<(usize, f32)> = Vec::new();
    for i in 0..total {
        let density = fertile_neighbors(tiles, i, dims);
        let weight = match tiles[i] {
            Tile::Fertile => 2.0,
            Tile::Grass | Tile::Meadow if density > 0 => 1.0,
            _ => continue,
        };
        let score = weight + density as f32 / 8.0 + rng.gen_range(0.0f32..0.5);
        candidates.push((i, score));
    }
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let wanted = (total as f32 / 1000.0 * cfg.cluster_centers_per_1k.max(0.0)).round() as usize;
    let radius = cfg.cluster_radius.max(0.0);
    let spacing_sq = (2.0 * radius).powi(2);

    let mut centers: Vec<(usize, usize)> = Vec::with_capacity(wanted);
    for (i, _) in candidates {
        if centers.len() >= wanted {
            break;
        }
        let (x, y) = dims.xy(i);
        let spaced = centers.iter().all(|&(cx, cy)| {
            let dx = cx as f32 - x as f32;
            let dy = cy as f32 - y as f32;
            dx * dx + dy * dy >= spacing_sq
        });
        if spaced {
            centers.push((x, y));
        }
    }

    let reach = radius.ceil() as i32;
    let two_sigma_sq = 2.0 * (radius * 0.5).powi(2).max(f32::EPSILON);
    let base_p = cfg.berry_base_p.clamp(0.0, 1.0);

    for &(cx, cy) in &centers {
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d_sq = (dx * dx + dy * dy) as f32;
                if d_sq > radius * radius {
                    continue;
                }
                let Some(n) = dims.offset(cx, cy, dx, dy) else {
                    continue;
                };
                if !bears_berries(tiles[n]) || trees[n] > 0 || rocks[n] > 0 {
                    continue;
                }
                let p = base_p * (-d_sq / two_sigma_sq).exp();
                if rng.gen_range(0.0f32..1.0) < p {
                    let bonus = u8::from(tiles[n] == Tile::Fertile);
                    berries[n] = (berries[n] + 1 + bonus).min(MAX_BERRIES);
                }
            }
        }
    }

    log::debug!("berries: {} cluster centers", centers.len());
    berries
}
