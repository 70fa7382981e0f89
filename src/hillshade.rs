//! Статическая отмывка рельефа.
//!
//! Нормаль оценивается ядром Собеля 3×3 по полю высот, освещённость считается
//! по Ламберту от фиксированного источника на северо-западе. Функция чистая:
//! от биомов и ресурсов не зависит, повторный вызов даёт тот же результат.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::ShadingConfig;

/// Направление на источник света до нормализации
const LIGHT: [f32; 3] = [-0.75, -0.65, 0.45];
/// Z-компонента нормали `(-gx, -gy, NORMAL_Z)`
const NORMAL_Z: f32 = 4.0;

fn light_dir() -> [f32; 3] {
    let len = (LIGHT[0] * LIGHT[0] + LIGHT[1] * LIGHT[1] + LIGHT[2] * LIGHT[2]).sqrt();
    [LIGHT[0] / len, LIGHT[1] / len, LIGHT[2] / len]
}

/// Считает отмывку `clamp(ambient + intensity · lambert, 0, 1)` для каждой клетки.
///
/// Крайние строки и столбцы копируют ближайшую внутреннюю клетку.
/// Если `height.len() != w · h` или карта уже 3 клеток, возвращается поле,
/// заполненное `ambient`; при `w · h == 0` — пустой вектор.
#[must_use]
pub fn make_hillshade(height: &[f32], w: usize, h: usize, cfg: &ShadingConfig) -> Vec<f32> {
    let total = w.saturating_mul(h);
    let ambient = cfg.ambient.clamp(0.0, 1.0);
    let intensity = cfg.intensity.clamp(0.0, 1.0);

    if total == 0 {
        return Vec::new();
    }
    if height.len() != total || w < 3 || h < 3 {
        return vec![ambient; total];
    }

    let light = light_dir();
    let mut out = vec![ambient; total];

    let shade_row = |y: usize, row: &mut [f32]| {
        if y == 0 || y == h - 1 {
            return;
        }
        let at = |x: usize, y: usize| height[y * w + x];
        for x in 1..w - 1 {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));

            let (nx, ny, nz) = (-gx, -gy, NORMAL_Z);
            let len = (nx * nx + ny * ny + nz * nz).sqrt();
            let lambert = ((nx * light[0] + ny * light[1] + nz * light[2]) / len).clamp(-1.0, 1.0);
            row[x] = (ambient + intensity * lambert).clamp(0.0, 1.0);
        }
    };

    #[cfg(feature = "parallel")]
    out.par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| shade_row(y, row));
    #[cfg(not(feature = "parallel"))]
    out.chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| shade_row(y, row));

    // Края: копия ближайшей внутренней клетки
    for y in 1..h - 1 {
        out[y * w] = out[y * w + 1];
        out[y * w + w - 1] = out[y * w + w - 2];
    }
    out.copy_within(w..2 * w, 0);
    out.copy_within((h - 2) * w..(h - 1) * w, (h - 1) * w);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(ambient: f32, intensity: f32) -> ShadingConfig {
        ShadingConfig { ambient, intensity }
    }

    #[test]
    fn test_flat_field_is_uniform() {
        let (w, h) = (8, 6);
        let shade = make_hillshade(&vec![0.5; w * h], w, h, &cfg(0.55, 0.45));
        // На плоскости нормаль (0, 0, 1): lambert = z-компонента света
        let expected = (0.55 + 0.45 * light_dir()[2]).clamp(0.0, 1.0);
        assert_eq!(shade.len(), w * h);
        for v in shade {
            assert!((v - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_slope_facing_light_is_brighter() {
        let (w, h) = (10, 10);
        // Высота растёт на восток: склон обращён на запад, к свету
        let east_up: Vec<f32> = (0..w * h).map(|i| (i % w) as f32 * 0.1).collect();
        let west_up: Vec<f32> = (0..w * h).map(|i| (w - 1 - i % w) as f32 * 0.1).collect();
        let lit = make_hillshade(&east_up, w, h, &cfg(0.5, 0.5));
        let dark = make_hillshade(&west_up, w, h, &cfg(0.5, 0.5));
        assert!(lit[5 * w + 5] > dark[5 * w + 5]);
    }

    #[test]
    fn test_borders_copy_interior() {
        let (w, h) = (7, 5);
        let height: Vec<f32> = (0..w * h).map(|i| ((i * 37) % 11) as f32 / 11.0).collect();
        let shade = make_hillshade(&height, w, h, &cfg(0.4, 0.6));
        for y in 1..h - 1 {
            assert_eq!(shade[y * w], shade[y * w + 1]);
            assert_eq!(shade[y * w + w - 1], shade[y * w + w - 2]);
        }
        assert_eq!(&shade[..w], &shade[w..2 * w]);
        assert_eq!(&shade[(h - 1) * w..], &shade[(h - 2) * w..(h - 1) * w]);
        assert!(shade.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_mismatch_fills_ambient() {
        let shade = make_hillshade(&[0.1, 0.2], 4, 4, &cfg(1.7, 0.3));
        assert_eq!(shade, vec![1.0; 16]);
        assert!(make_hillshade(&[], 0, 5, &cfg(0.5, 0.5)).is_empty());
    }

    #[test]
    fn test_is_pure() {
        let (w, h) = (9, 9);
        let height: Vec<f32> = (0..w * h).map(|i| (i as f32 * 0.37).sin()).collect();
        let c = cfg(0.55, 0.45);
        assert_eq!(make_hillshade(&height, w, h, &c), make_hillshade(&height, w, h, &c));
    }
}
