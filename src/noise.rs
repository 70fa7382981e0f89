//! Градиентный шум и фрактальная сумма (fBm).
//!
//! Основной источник — `GradientNoise`: таблица перестановок из 256 индексов,
//! перемешанных Фишером–Йетсом на генераторе `mulberry32`, и 8 единичных градиентов
//! с шагом 45°. Этот путь побитово воспроизводим. Альтернативный источник
//! `SimplexNoise` берёт `OpenSimplex2` из `fastnoise-lite`.

use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::config::NoiseBackend;

const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// 8 единичных градиентов с шагом 45°
const GRADIENTS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (DIAG, DIAG),
    (0.0, 1.0),
    (-DIAG, DIAG),
    (-1.0, 0.0),
    (-DIAG, -DIAG),
    (0.0, -1.0),
    (DIAG, -DIAG),
];

/// Маленький быстрый ГПСЧ `mulberry32`.
///
/// Нужен только для построения таблицы перестановок: так таблица зависит лишь от сида.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Число в `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

/// Любой двумерный источник шума со значениями примерно в `[-1, 1]`
pub trait NoiseSource {
    fn noise2d(&self, x: f32, y: f32) -> f32;
}

/// Градиентный шум с 8 направлениями
#[derive(Debug, Clone)]
pub struct GradientNoise {
    /// 256 перемешанных индексов, продублированных до 512, чтобы не проверять переполнение
    perm: [u8; 512],
}

impl GradientNoise {
    #[must_use]
    pub fn new(seed: u32) -> Self {
        let mut rng = Mulberry32::new(seed);
        let mut base: [u8; 256] = std::array::from_fn(|i| i as u8);
        for i in (1..256usize).rev() {
            let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
            base.swap(i, j);
        }

        let mut perm = [0u8; 512];
        for (i, p) in perm.iter_mut().enumerate() {
            *p = base[i & 255];
        }
        Self { perm }
    }

    fn corner(&self, xi: usize, yi: usize) -> usize {
        self.perm[self.perm[xi] as usize + yi] as usize & 7
    }
}

fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}

fn grad_dot(hash: usize, dx: f32, dy: f32) -> f32 {
    let (gx, gy) = GRADIENTS[hash];
    gx * dx + gy * dy
}

impl NoiseSource for GradientNoise {
    fn noise2d(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = (x0 as i32 & 255) as usize;
        let yi = (y0 as i32 & 255) as usize;
        let xf = x - x0;
        let yf = y - y0;

        let u = fade(xf);
        let v = fade(yf);

        let aa = self.corner(xi, yi);
        let ab = self.corner(xi, yi + 1);
        let ba = self.corner(xi + 1, yi);
        let bb = self.corner(xi + 1, yi + 1);

        let x1 = lerp(u, grad_dot(aa, xf, yf), grad_dot(ba, xf - 1.0, yf));
        let x2 = lerp(
            u,
            grad_dot(ab, xf, yf - 1.0),
            grad_dot(bb, xf - 1.0, yf - 1.0),
        );
        lerp(v, x1, x2)
    }
}

/// `OpenSimplex2` из `fastnoise-lite`, один октав на частоте 1
pub struct SimplexNoise {
    inner: FastNoiseLite,
}

impl SimplexNoise {
    #[must_use]
    pub fn new(seed: u32) -> Self {
        let mut inner = FastNoiseLite::new();
        inner.set_seed(Some(seed as i32));
        inner.set_noise_type(Some(NoiseType::OpenSimplex2));
        inner.set_frequency(Some(1.0));
        Self { inner }
    }
}

impl NoiseSource for SimplexNoise {
    fn noise2d(&self, x: f32, y: f32) -> f32 {
        self.inner.get_noise_2d(x, y)
    }
}

/// Создаёт источник шума выбранного типа
#[must_use]
pub fn make_noise(backend: NoiseBackend, seed: u32) -> Box<dyn NoiseSource> {
    match backend {
        NoiseBackend::Gradient8 => Box::new(GradientNoise::new(seed)),
        NoiseBackend::OpenSimplex2 => Box::new(SimplexNoise::new(seed)),
    }
}

/// Фрактальное броуновское движение.
///
/// Частота стартует с `scale` и умножается на `lacunarity`, амплитуда — на `gain`.
/// Сумма делится на сумму реально использованных амплитуд, поэтому результат
/// остаётся в диапазоне исходного шума при любом числе октав.
pub fn fbm2d<N: NoiseSource + ?Sized>(
    noise: &N,
    x: f32,
    y: f32,
    scale: f32,
    octaves: u32,
    lacunarity: f32,
    gain: f32,
) -> f32 {
    let mut frequency = scale;
    let mut amplitude = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;

    for _ in 0..octaves {
        sum += amplitude * noise.noise2d(x * frequency, y * frequency);
        norm += amplitude;
        frequency *= lacunarity;
        amplitude *= gain;
    }

    if norm > 0.0 { sum / norm } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mulberry32_known_sequence_is_stable() {
        let mut a = Mulberry32::new(42);
        let mut b = Mulberry32::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        let f = Mulberry32::new(1).next_f64();
        assert!((0.0..1.0).contains(&f));
    }

    #[test]
    fn test_permutation_is_duplicated_permutation() {
        let noise = GradientNoise::new(12345);
        let mut seen = [false; 256];
        for &p in &noise.perm[..256] {
            seen[p as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(noise.perm[..256], noise.perm[256..]);
    }

    #[test]
    fn test_noise_zero_at_lattice_points() {
        let noise = GradientNoise::new(7);
        for i in -3..3 {
            for j in -3..3 {
                assert!(noise.noise2d(i as f32, j as f32).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_noise_bounded_and_seed_dependent() {
        let a = GradientNoise::new(1);
        let b = GradientNoise::new(2);
        let mut differs = false;
        for i in 0..200 {
            let x = i as f32 * 0.37 - 20.0;
            let y = i as f32 * 0.71 + 3.0;
            let va = a.noise2d(x, y);
            assert!((-1.0..=1.0).contains(&va), "noise out of range: {va}");
            if (va - b.noise2d(x, y)).abs() > 1e-4 {
                differs = true;
            }
        }
        assert!(differs);
    }

    #[test]
    fn test_fbm_single_octave_matches_noise() {
        let noise = GradientNoise::new(99);
        let direct = noise.noise2d(3.3 * 0.1, 4.4 * 0.1);
        let fbm = fbm2d(&noise, 3.3, 4.4, 0.1, 1, 2.0, 0.5);
        assert!((direct - fbm).abs() < 1e-6);
        assert!(fbm2d(&noise, 1.0, 1.0, 0.1, 0, 2.0, 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fbm_stays_normalized() {
        let noise = make_noise(NoiseBackend::Gradient8, 5);
        for i in 0..100 {
            let v = fbm2d(noise.as_ref(), i as f32 * 1.3, i as f32 * 0.7, 0.05, 5, 2.0, 0.5);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_simplex_backend_is_deterministic() {
        let a = make_noise(NoiseBackend::OpenSimplex2, 11);
        let b = make_noise(NoiseBackend::OpenSimplex2, 11);
        for i in 0..20 {
            let x = i as f32 * 0.23;
            assert!((a.noise2d(x, -x) - b.noise2d(x, -x)).abs() < f32::EPSILON);
        }
    }
}
