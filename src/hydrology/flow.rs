use crate::grid::{DIRS8, Dims};

/// Направление стока «нет» (локальный минимум)
pub const NO_FLOW: u8 = u8::MAX;

/// Перепады высот ближе этого значения считаются равными
const TIE_EPS: f32 = 1e-5;

/// Доля наибольшего перепада, в пределах которой `meander_jitter = 1` может
/// увести сток к соседу с меньшим перепадом
const MEANDER_SPREAD: f32 = 0.5;

const DIAG_WEIGHT: f32 = 0.707;

/// Детерминированный хэш `(x, y, dir, seed)` в `[0, 1)`.
///
/// Сид передаётся явно, так что результат не зависит от порядка вызовов.
#[must_use]
pub fn hash3(x: usize, y: usize, dir: u8, seed: u32) -> f32 {
    let mut h = seed
        ^ (x as u32).wrapping_mul(0x27D4_EB2D)
        ^ (y as u32).wrapping_mul(0x1656_67B1)
        ^ u32::from(dir).wrapping_mul(0x9E37_79B9);
    h = (h ^ (h >> 15)).wrapping_mul(0x85EB_CA6B);
    h = (h ^ (h >> 13)).wrapping_mul(0xC2B2_AE35);
    h ^= h >> 16;
    (h >> 8) as f32 / 16_777_216.0
}

/// Модуль градиента высоты по центральным разностям.
///
/// На границе вместо отсутствующего соседа берётся сама клетка. Результат
/// расширяется максимумом диагональных перепадов × 0.707, чтобы диагональные
/// гребни не терялись.
#[must_use]
pub fn compute_slope(height: &[f32], dims: Dims) -> Vec<f32> {
    let total = dims.len();
    if height.len() != total {
        return vec![0.0; total];
    }

    let mut slope = Vec::with_capacity(total);
    for y in 0..dims.h {
        let yu = y.saturating_sub(1);
        let yd = (y + 1).min(dims.h - 1);
        for x in 0..dims.w {
            let xl = x.saturating_sub(1);
            let xr = (x + 1).min(dims.w - 1);

            let dx = (height[dims.idx(xr, y)] - height[dims.idx(xl, y)]) / (xr - xl).max(1) as f32;
            let dy = (height[dims.idx(x, yd)] - height[dims.idx(x, yu)]) / (yd - yu).max(1) as f32;
            let magnitude = (dx * dx + dy * dy).sqrt();

            let here = height[dims.idx(x, y)];
            let diagonal = [(-1, -1), (1, -1), (-1, 1), (1, 1)]
                .iter()
                .filter_map(|&(ox, oy)| dims.offset(x, y, ox, oy))
                .map(|n| (height[n] - here).abs())
                .fold(0.0f32, f32::max);

            slope.push(magnitude.max(diagonal * DIAG_WEIGHT));
        }
    }
    slope
}

/// Индексы клеток по убыванию высоты; при равной высоте — по возрастанию индекса
#[must_use]
pub fn descending_order(height: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..height.len()).collect();
    order.sort_by(|&a, &b| height[b].total_cmp(&height[a]).then(a.cmp(&b)));
    order
}

/// Направления стока (D8) и накопленный сток
#[derive(Debug, Clone)]
pub struct FlowField {
    /// Индекс в `DIRS8` или `NO_FLOW`
    pub dir: Vec<u8>,
    /// Число клеток выше по течению, включая саму клетку (≥ 1)
    pub accum: Vec<f32>,
    /// Индексы клеток по убыванию высоты, см. [`descending_order`]
    pub order: Vec<usize>,
}

impl FlowField {
    /// Клетка, в которую стекает вода из `i`
    #[must_use]
    pub fn downstream(&self, i: usize, dims: Dims) -> Option<usize> {
        let d = *self.dir.get(i)?;
        if d == NO_FLOW {
            return None;
        }
        let (x, y) = dims.xy(i);
        let (dx, dy) = DIRS8[d as usize];
        dims.offset(x, y, dx, dy)
    }
}

/// Выбирает для каждой клетки соседа с наибольшим перепадом и накапливает сток.
///
/// Кандидаты — соседи, чей перепад отстаёт от наибольшего не больше чем на
/// `TIE_EPS + best_drop × meander_jitter × MEANDER_SPREAD`; среди них побеждает
/// перепад плюс хэш `(x, y, dir, seed)` в том же окне, поэтому сток не
/// выстраивается строго по сетке. При нулевом дрожании выбирается наибольший
/// перепад. Накопление — один проход в порядке убывания высоты: сосед ниже
/// всегда обрабатывается позже. Порядок сохраняется в [`FlowField::order`].
#[must_use]
pub fn flow_dir_and_accum(height: &[f32], dims: Dims, seed: u32, meander_jitter: f32) -> FlowField {
    let total = dims.len();
    let mut dir = vec![NO_FLOW; total];
    let mut accum = vec![1.0f32; total];
    if height.len() != total {
        return FlowField {
            dir,
            accum,
            order: Vec::new(),
        };
    }

    for y in 0..dims.h {
        for x in 0..dims.w {
            let i = dims.idx(x, y);
            let here = height[i];

            let best_drop = DIRS8
                .iter()
                .filter_map(|&(dx, dy)| dims.offset(x, y, dx, dy))
                .map(|n| here - height[n])
                .fold(0.0f32, f32::max);
            if best_drop <= 0.0 {
                continue;
            }

            let spread = best_drop * meander_jitter.max(0.0) * MEANDER_SPREAD;
            let mut best_score = f32::NEG_INFINITY;
            for (d, &(dx, dy)) in DIRS8.iter().enumerate() {
                let Some(n) = dims.offset(x, y, dx, dy) else {
                    continue;
                };
                let drop = here - height[n];
                if drop <= 0.0 || drop < best_drop - TIE_EPS - spread {
                    continue;
                }
                let score = drop + hash3(x, y, d as u8, seed) * spread;
                if score > best_score {
                    best_score = score;
                    dir[i] = d as u8;
                }
            }
        }
    }

    let flow = FlowField {
        dir,
        accum: Vec::new(),
        order: descending_order(height),
    };
    for &i in &flow.order {
        if let Some(n) = flow.downstream(i, dims) {
            accum[n] += accum[i];
        }
    }

    FlowField { accum, ..flow }
}
