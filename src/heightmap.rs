//! Синтез полей высоты и влажности.
//!
//! Высота — 5 октав fBm, нормализованные в `[0, 1]`, затем радиальный спад к краям
//! карты и повторная нормализация. Влажность — 4 октавы fBm в искажённых
//! координатах, нормализованные в `[0.04, 0.96]`.

use crate::config::TerrainConfig;
use crate::grid::Dims;
use crate::noise::{NoiseSource, fbm2d, make_noise};

const HEIGHT_SALT: u32 = 0x9E37_79B9;
const MOISTURE_SALT: u32 = 0x85EB_CA6B;
const WARP_SALT: u32 = 0xC2B2_AE35;

/// Высота, к которой стягивается рельеф у краёв карты
const FALLOFF_BASELINE: f32 = 0.06;
const FALLOFF_EXPONENT: f32 = 1.8;
const FALLOFF_STRENGTH: f32 = 0.55;

const MOISTURE_MIN: f32 = 0.04;
const MOISTURE_MAX: f32 = 0.96;

/// Пара полей высоты и влажности, обе длины `w * h`
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMoisture {
    pub height: Vec<f32>,
    pub moisture: Vec<f32>,
}

/// Строит нормализованные поля высоты и влажности
#[must_use]
pub fn make_height_moisture(seed: u32, dims: Dims, cfg: &TerrainConfig) -> HeightMoisture {
    let total = dims.len();
    if total == 0 {
        return HeightMoisture {
            height: Vec::new(),
            moisture: Vec::new(),
        };
    }

    let backend = cfg.noise.backend;
    let height_noise = make_noise(backend, seed ^ HEIGHT_SALT);
    let moisture_noise = make_noise(backend, seed ^ MOISTURE_SALT);
    let warp_noise = make_noise(backend, seed ^ WARP_SALT);

    let mut height = Vec::with_capacity(total);
    let mut moisture = Vec::with_capacity(total);

    for y in 0..dims.h {
        for x in 0..dims.w {
            let (fx, fy) = (x as f32, y as f32);
            height.push(fbm2d(
                height_noise.as_ref(),
                fx,
                fy,
                cfg.height_scale,
                5,
                2.0,
                0.5,
            ));
            moisture.push(warped_moisture(
                moisture_noise.as_ref(),
                warp_noise.as_ref(),
                fx,
                fy,
                cfg,
            ));
        }
    }

    normalize(&mut height, 0.0, 1.0);
    normalize(&mut moisture, MOISTURE_MIN, MOISTURE_MAX);

    apply_radial_falloff(&mut height, dims);
    normalize(&mut height, 0.0, 1.0);

    HeightMoisture { height, moisture }
}

fn warped_moisture(
    moisture: &dyn NoiseSource,
    warp: &dyn NoiseSource,
    x: f32,
    y: f32,
    cfg: &TerrainConfig,
) -> f32 {
    // Два некоррелированных отсчёта одного поля: смещение по x и по y
    let wx = fbm2d(warp, x, y, cfg.warp_scale, 2, 2.0, 0.5);
    let wy = fbm2d(warp, x + 97.3, y - 41.9, cfg.warp_scale, 2, 2.0, 0.5);
    fbm2d(
        moisture,
        x + wx * cfg.warp_amp,
        y + wy * cfg.warp_amp,
        cfg.moisture_scale,
        4,
        2.0,
        0.5,
    )
}

/// Стягивает высоту к `FALLOFF_BASELINE` по мере удаления от центра карты
fn apply_radial_falloff(height: &mut [f32], dims: Dims) {
    let cx = (dims.w as f32 - 1.0) * 0.5;
    let cy = (dims.h as f32 - 1.0) * 0.5;

    for (i, h) in height.iter_mut().enumerate() {
        let (x, y) = dims.xy(i);
        let nx = if cx > 0.0 { (x as f32 - cx) / cx } else { 0.0 };
        let ny = if cy > 0.0 { (y as f32 - cy) / cy } else { 0.0 };
        let r = (nx * nx + ny * ny).sqrt();
        let falloff = (1.0 - r.powf(FALLOFF_EXPONENT) * FALLOFF_STRENGTH).clamp(0.0, 1.0);
        *h = *h * falloff + FALLOFF_BASELINE * (1.0 - falloff);
    }
}

/// Линейно переводит значения в `[lo, hi]`. Постоянное поле становится серединой диапазона.
pub fn normalize(data: &mut [f32], lo: f32, hi: f32) {
    let min = data.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max = data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

    if !(max - min).is_finite() || max - min <= f32::EPSILON {
        data.fill((lo + hi) * 0.5);
        return;
    }

    let span = hi - lo;
    for v in data.iter_mut() {
        *v = (lo + (*v - min) / (max - min) * span).clamp(lo, hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseBackend;

    #[test]
    fn test_fields_in_range_and_sized() {
        let dims = Dims::new(48, 32);
        let fields = make_height_moisture(12345, dims, &TerrainConfig::default());
        assert_eq!(fields.height.len(), dims.len());
        assert_eq!(fields.moisture.len(), dims.len());
        assert!(fields.height.iter().all(|h| (0.0..=1.0).contains(h)));
        assert!(
            fields
                .moisture
                .iter()
                .all(|m| (MOISTURE_MIN..=MOISTURE_MAX).contains(m))
        );

        // Обе нормализации используют весь диапазон
        let max = fields.height.iter().fold(0.0f32, |a, &b| a.max(b));
        let min = fields.height.iter().fold(1.0f32, |a, &b| a.min(b));
        assert!((max - 1.0).abs() < 1e-6);
        assert!(min.abs() < 1e-6);
    }

    #[test]
    fn test_deterministic_and_seed_sensitive() {
        let dims = Dims::new(24, 24);
        let cfg = TerrainConfig::default();
        let a = make_height_moisture(5, dims, &cfg);
        let b = make_height_moisture(5, dims, &cfg);
        let c = make_height_moisture(6, dims, &cfg);
        assert_eq!(a, b);
        assert_ne!(a.height, c.height);
    }

    #[test]
    fn test_falloff_biases_land_to_interior() {
        let dims = Dims::new(64, 64);
        let fields = make_height_moisture(777, dims, &TerrainConfig::default());

        let mut edge_sum = 0.0;
        let mut edge_n = 0;
        let mut inner_sum = 0.0;
        let mut inner_n = 0;
        for y in 0..dims.h {
            for x in 0..dims.w {
                let h = fields.height[dims.idx(x, y)];
                if dims.on_edge(x, y) {
                    edge_sum += h;
                    edge_n += 1;
                } else if (16..48).contains(&x) && (16..48).contains(&y) {
                    inner_sum += h;
                    inner_n += 1;
                }
            }
        }
        assert!(inner_sum / inner_n as f32 > edge_sum / edge_n as f32);
    }

    #[test]
    fn test_degenerate_dims() {
        let cfg = TerrainConfig::default();
        let empty = make_height_moisture(1, Dims::new(0, 10), &cfg);
        assert!(empty.height.is_empty() && empty.moisture.is_empty());

        let single = make_height_moisture(1, Dims::new(1, 1), &cfg);
        assert_eq!(single.height.len(), 1);
        assert!((0.0..=1.0).contains(&single.height[0]));
    }

    #[test]
    fn test_simplex_backend_in_range() {
        let mut cfg = TerrainConfig::default();
        cfg.noise.backend = NoiseBackend::OpenSimplex2;
        let fields = make_height_moisture(3, Dims::new(20, 20), &cfg);
        assert!(fields.height.iter().all(|h| (0.0..=1.0).contains(h)));
        assert!(fields.moisture.iter().all(|m| (0.0..=1.0).contains(m)));
    }

    #[test]
    fn test_normalize_constant_field() {
        let mut data = vec![0.3; 5];
        normalize(&mut data, 0.0, 1.0);
        assert!(data.iter().all(|&v| (v - 0.5).abs() < f32::EPSILON));
    }
}
