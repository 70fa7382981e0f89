//! Расчистка области появления игрока.

use crate::biome::Tile;
use crate::grid::Dims;

/// На сколько клеток квадрат расчистки выходит за круг
const SQUARE_MARGIN: i64 = 1;

/// Ресурсные слои мира, которые обнуляются вместе с тайлами
pub struct ResourceLayers<'a> {
    pub trees: &'a mut [u8],
    pub rocks: &'a mut [u8],
    pub berries: &'a mut [u8],
}

/// Превращает круг радиуса `r` вокруг `(cx, cy)` и окружающий его квадрат
/// с полустороной `r + 1` в пустую траву.
///
/// Квадрат целиком покрывает круг, так что расчищается ровно он; при `r = 0`
/// это 3×3. Безусловная операция: выполняется последней и перекрывает всё, что
/// нагенерировали предыдущие этапы. Клетки за краем карты пропускаются.
pub fn clear_spawn_area(
    tiles: &mut [Tile],
    layers: ResourceLayers<'_>,
    dims: Dims,
    cx: usize,
    cy: usize,
    r: usize,
) {
    let total = dims.len();
    if tiles.len() != total
        || layers.trees.len() != total
        || layers.rocks.len() != total
        || layers.berries.len() != total
    {
        return;
    }

    // Радиус больше карты ничего не добавляет
    let r = i64::try_from(r.min(dims.w.max(dims.h))).unwrap_or(i64::MAX - SQUARE_MARGIN);
    let reach = i32::try_from(r + SQUARE_MARGIN).unwrap_or(i32::MAX);
    let mut cleared = 0usize;

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let Some(i) = dims.offset(cx, cy, dx, dy) else {
                continue;
            };
            tiles[i] = Tile::Grass;
            layers.trees[i] = 0;
            layers.rocks[i] = 0;
            layers.berries[i] = 0;
            cleared += 1;
        }
    }

    log::debug!("spawn: cleared {cleared} tiles around ({cx}, {cy})");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clears_square_around_circle() {
        let dims = Dims::new(16, 16);
        let mut tiles = vec![Tile::Rock; dims.len()];
        let mut trees = vec![2u8; dims.len()];
        let mut rocks = vec![3u8; dims.len()];
        let mut berries = vec![1u8; dims.len()];

        let layers = ResourceLayers {
            trees: &mut trees,
            rocks: &mut rocks,
            berries: &mut berries,
        };
        clear_spawn_area(&mut tiles, layers, dims, 8, 8, 3);

        for i in 0..dims.len() {
            let (x, y) = dims.xy(i);
            let dx = x.abs_diff(8);
            let dy = y.abs_diff(8);
            if dx <= 4 && dy <= 4 {
                assert_eq!(tiles[i], Tile::Grass);
                assert_eq!((trees[i], rocks[i], berries[i]), (0, 0, 0));
            } else {
                assert_eq!(tiles[i], Tile::Rock);
                assert_eq!(trees[i], 2);
            }
        }
    }

    #[test]
    fn test_zero_radius_clears_three_by_three() {
        let dims = Dims::new(5, 5);
        let mut tiles = vec![Tile::Water; dims.len()];
        let mut trees = vec![1u8; dims.len()];
        let mut rocks = vec![1u8; dims.len()];
        let mut berries = vec![1u8; dims.len()];
        let layers = ResourceLayers {
            trees: &mut trees,
            rocks: &mut rocks,
            berries: &mut berries,
        };
        clear_spawn_area(&mut tiles, layers, dims, 0, 0, 0);

        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(tiles[dims.idx(x, y)], Tile::Grass);
        }
        assert_eq!(tiles[dims.idx(2, 0)], Tile::Water);
        assert_eq!(tiles.iter().filter(|&&t| t == Tile::Grass).count(), 4);
    }

    #[test]
    fn test_huge_radius_clears_whole_map() {
        let dims = Dims::new(6, 4);
        let mut tiles = vec![Tile::Forest; dims.len()];
        let mut trees = vec![3u8; dims.len()];
        let mut rocks = vec![0u8; dims.len()];
        let mut berries = vec![0u8; dims.len()];
        let layers = ResourceLayers {
            trees: &mut trees,
            rocks: &mut rocks,
            berries: &mut berries,
        };
        clear_spawn_area(&mut tiles, layers, dims, 5, 3, usize::MAX);
        assert!(tiles.iter().all(|&t| t == Tile::Grass));
        assert!(trees.iter().all(|&t| t == 0));
    }

    #[test]
    fn test_mismatched_layers_are_ignored() {
        let dims = Dims::new(4, 4);
        let mut tiles = vec![Tile::Rock; dims.len()];
        let mut trees = vec![0u8; 3];
        let mut rocks = vec![0u8; dims.len()];
        let mut berries = vec![0u8; dims.len()];
        let layers = ResourceLayers {
            trees: &mut trees,
            rocks: &mut rocks,
            berries: &mut berries,
        };
        clear_spawn_area(&mut tiles, layers, dims, 2, 2, 2);
        assert!(tiles.iter().all(|&t| t == Tile::Rock));
    }
}
