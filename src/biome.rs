use serde::{Deserialize, Serialize};

use crate::config::{BiomeSettings, RockSettings};
use crate::grid::Dims;
use crate::hydrology::WaterMasks;

/// Допуск доли скал при калибровке
pub const ROCK_TOLERANCE: f32 = 0.02;

const MAX_CALIBRATION_ITERS: usize = 3;

/// Тип тайла
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Tile {
    #[default]
    Grass = 0,
    Forest = 1,
    Rock = 2,
    Water = 3,
    Fertile = 4,
    /// Пашня: генератор её не ставит, её создаёт игровая логика
    Farmland = 5,
    Sand = 6,
    Snow = 7,
    Meadow = 8,
    Marsh = 9,
}

impl Tile {
    pub const ALL: [Tile; 10] = [
        Tile::Grass,
        Tile::Forest,
        Tile::Rock,
        Tile::Water,
        Tile::Fertile,
        Tile::Farmland,
        Tile::Sand,
        Tile::Snow,
        Tile::Meadow,
        Tile::Marsh,
    ];

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_u8(value: u8) -> Option<Tile> {
        Tile::ALL.get(value as usize).copied()
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        match self {
            Tile::Grass => [110, 170, 80],
            Tile::Forest => [40, 100, 45],
            Tile::Rock => [130, 130, 125],
            Tile::Water => [50, 100, 180],
            Tile::Fertile => [90, 150, 50],
            Tile::Farmland => [150, 115, 65],
            Tile::Sand => [215, 200, 140],
            Tile::Snow => [235, 240, 250],
            Tile::Meadow => [150, 195, 95],
            Tile::Marsh => [85, 110, 75],
        }
    }
}

/// Входные поля классификации
#[derive(Debug, Clone, Copy)]
pub struct BiomeInput<'a> {
    pub dims: Dims,
    pub height: &'a [f32],
    pub moisture: &'a [f32],
    pub slope: &'a [f32],
    pub masks: &'a WaterMasks,
}

/// Итог классификации и калибровки скал
#[derive(Debug, Clone)]
pub struct BiomeMap {
    pub tiles: Vec<Tile>,
    /// Доля `Rock` от всей карты сразу после калибровки
    pub rock_ratio: f32,
    /// Сколько раз измерялась доля скал (1..=3)
    pub iterations: usize,
    pub h_rock: f32,
    pub s_rock: f32,
}

/// Назначает базовые биомы.
///
/// Порядок: вода из масок, снег выше `snow_height`, калибровка скал, затем берег
/// (песок/болото), луга и плодородные земли на оставшейся траве.
#[must_use]
pub fn assign_base_biomes(
    input: &BiomeInput<'_>,
    biome: &BiomeSettings,
    rock: &RockSettings,
) -> BiomeMap {
    let total = input.dims.len();
    let sized = [
        input.height.len(),
        input.moisture.len(),
        input.slope.len(),
        input.masks.water.len(),
        input.masks.shoreline.len(),
    ]
    .iter()
    .all(|&len| len == total);
    if !sized {
        return BiomeMap {
            tiles: vec![Tile::Grass; total],
            rock_ratio: 0.0,
            iterations: 0,
            h_rock: rock.initial_height,
            s_rock: rock.initial_slope,
        };
    }

    let mut tiles: Vec<Tile> = (0..total)
        .map(|i| {
            if input.masks.water[i] {
                Tile::Water
            } else if input.height[i] >= biome.snow_height {
                Tile::Snow
            } else {
                Tile::Grass
            }
        })
        .collect();

    let eligible: Vec<usize> = (0..total).filter(|&i| tiles[i] == Tile::Grass).collect();
    let calibration = calibrate_rock(input, &eligible, rock);
    for &i in &eligible {
        if input.height[i] >= calibration.h_rock || input.slope[i] >= calibration.s_rock {
            tiles[i] = Tile::Rock;
        }
    }

    for i in 0..total {
        if tiles[i] != Tile::Grass {
            continue;
        }
        let m = input.moisture[i];

        if input.masks.shoreline[i] {
            tiles[i] = if m < biome.sand_marsh_moisture {
                Tile::Sand
            } else {
                Tile::Marsh
            };
            continue;
        }

        if input.slope[i] < biome.meadow_max_slope
            && m >= biome.meadow_moisture_min
            && m < biome.meadow_moisture_max
        {
            tiles[i] = Tile::Meadow;
        }
        if m >= biome.fertile_moisture && input.height[i] <= biome.fertile_max_height {
            tiles[i] = Tile::Fertile;
        }
    }

    log::debug!(
        "biomes: rock ratio {:.3} after {} iteration(s), h_rock={:.3} s_rock={:.4}",
        calibration.ratio,
        calibration.iterations,
        calibration.h_rock,
        calibration.s_rock
    );

    BiomeMap {
        tiles,
        rock_ratio: calibration.ratio,
        iterations: calibration.iterations,
        h_rock: calibration.h_rock,
        s_rock: calibration.s_rock,
    }
}

struct RockCalibration {
    h_rock: f32,
    s_rock: f32,
    ratio: f32,
    iterations: usize,
}

/// Подбирает пороги скал так, чтобы доля `Rock` попала в `target ± 0.02`.
///
/// Скала — клетка, где `h >= h_rock` или `s >= s_rock`, то есть
/// `max(h / h_rock, s / s_rock) >= 1`. Умножение обоих порогов на `k` переносит
/// границу на `k`, поэтому поправка берётся как квантиль этой оценки.
fn calibrate_rock(input: &BiomeInput<'_>, eligible: &[usize], rock: &RockSettings) -> RockCalibration {
    let total = input.dims.len().max(1) as f32;
    let target = rock.target_ratio.clamp(0.0, 1.0);
    let mut h_rock = rock.initial_height.max(1e-6);
    let mut s_rock = rock.initial_slope.max(1e-6);

    let count_rock = |h_rock: f32, s_rock: f32| {
        eligible
            .iter()
            .filter(|&&i| input.height[i] >= h_rock || input.slope[i] >= s_rock)
            .count()
    };

    let mut ratio = count_rock(h_rock, s_rock) as f32 / total;
    let mut iterations = 1;

    while (ratio - target).abs() > ROCK_TOLERANCE && iterations < MAX_CALIBRATION_ITERS {
        let mut scores: Vec<f32> = eligible
            .iter()
            .map(|&i| (input.height[i] / h_rock).max(input.slope[i] / s_rock))
            .collect();
        scores.sort_by(|a, b| b.total_cmp(a));

        if scores.is_empty() {
            break;
        }
        let k = quantile_cut(&scores, (target * total).round() as usize);
        if !k.is_finite() || k <= 0.0 {
            break;
        }

        h_rock *= k;
        s_rock *= k;
        ratio = count_rock(h_rock, s_rock) as f32 / total;
        iterations += 1;
    }

    RockCalibration {
        h_rock,
        s_rock,
        ratio,
        iterations,
    }
}

/// Порог, при котором `score >= cut` выполняется примерно для `wanted` оценок.
///
/// `scores` отсортированы по убыванию и не пусты. Группа равных оценок на границе
/// целиком попадает по ту сторону порога, которая ближе к `wanted`.
fn quantile_cut(scores: &[f32], wanted: usize) -> f32 {
    if wanted == 0 {
        return scores[0] * 1.01 + f32::EPSILON;
    }
    if wanted >= scores.len() {
        return scores[scores.len() - 1];
    }

    let pivot = scores[wanted - 1];
    let above = scores.iter().take_while(|&&s| s > pivot).count();
    let through = scores.iter().take_while(|&&s| s >= pivot).count();

    if wanted - above <= through - wanted {
        if above == 0 {
            pivot * 1.01 + f32::EPSILON
        } else {
            (scores[above - 1] + pivot) * 0.5
        }
    } else if through < scores.len() {
        (pivot + scores[through]) * 0.5
    } else {
        pivot
    }
}
