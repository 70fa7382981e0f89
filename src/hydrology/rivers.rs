use image::{ImageBuffer, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RiverSettings;
use crate::grid::{DIRS8, Dims};
use crate::hydrology::flow::FlowField;

/// Вес случайного дрожания при выходе из ямы
const ESCAPE_JITTER_SCALE: f32 = 0.01;

/// Шаг (в тайлах) при проходе по сглаженной линии реки
const RASTER_STEP: f32 = 0.35;

/// Куда впадает река
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiverExit {
    Lake,
    Edge,
}

/// Сглаженная линия реки
#[derive(Debug, Clone)]
pub struct River {
    /// Точки в координатах тайлов (центр тайла — целые координаты)
    pub points: Vec<(f32, f32)>,
    /// Длина трассы в клетках (до сглаживания)
    pub length: usize,
    pub exit: RiverExit,
}

/// Всё, что нужно для трассировки рек
#[derive(Debug, Clone, Copy)]
pub struct RiverBasin<'a> {
    pub dims: Dims,
    pub height: &'a [f32],
    pub flow: &'a FlowField,
    pub lake: &'a [bool],
}

/// Истоки: локальные максимумы выше `source_min`, не ближе `source_spacing` друг к другу.
///
/// Кандидатов берётся до `4 × count` — часть трасс не удастся.
#[must_use]
pub fn find_river_sources(basin: &RiverBasin<'_>, cfg: &RiverSettings) -> Vec<usize> {
    let dims = basin.dims;
    let height = basin.height;
    let cap = cfg.count.saturating_mul(4);
    let spacing_sq = cfg.source_spacing * cfg.source_spacing;
    let mut sources: Vec<usize> = Vec::new();

    for &i in &basin.flow.order {
        if sources.len() >= cap {
            break;
        }
        let h = height[i];
        if h < cfg.source_min {
            break;
        }
        let (x, y) = dims.xy(i);
        if basin.lake[i] || dims.on_edge(x, y) {
            continue;
        }

        let is_peak = DIRS8
            .iter()
            .filter_map(|&(dx, dy)| dims.offset(x, y, dx, dy))
            .all(|n| height[n] <= h);
        if !is_peak {
            continue;
        }

        let far_enough = sources.iter().all(|&s| {
            let (sx, sy) = dims.xy(s);
            let ddx = sx as f32 - x as f32;
            let ddy = sy as f32 - y as f32;
            ddx * ddx + ddy * ddy >= spacing_sq
        });
        if far_enough {
            sources.push(i);
        }
    }

    sources
}

/// Выбирает следующий шаг среди свободных соседей: наибольший перепад плюс дрожание.
///
/// Используется, когда направление стока отсутствует (яма) или ведёт в уже
/// пройденную клетку. Перепад может быть отрицательным — так река выбирается из ямы.
pub fn choose_downstream<R: Rng>(
    i: usize,
    height: &[f32],
    dims: Dims,
    is_free: impl Fn(usize) -> bool,
    rng: &mut R,
    jitter: f32,
) -> Option<usize> {
    let (x, y) = dims.xy(i);
    let here = height[i];
    let mut best: Option<(usize, f32)> = None;

    for &(dx, dy) in &DIRS8 {
        let Some(n) = dims.offset(x, y, dx, dy) else {
            continue;
        };
        if !is_free(n) {
            continue;
        }
        let score = here - height[n] + rng.gen_range(0.0f32..1.0) * jitter * ESCAPE_JITTER_SCALE;
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((n, score));
        }
    }

    best.map(|(n, _)| n)
}

/// Трассировщик: помнит клетки уже принятых рек и посещённые клетки текущей трассы
struct Tracer<'a> {
    basin: RiverBasin<'a>,
    traced: Vec<Option<RiverExit>>,
    visited: Vec<u32>,
    stamp: u32,
}

impl<'a> Tracer<'a> {
    fn new(basin: RiverBasin<'a>) -> Self {
        let total = basin.dims.len();
        Self {
            basin,
            traced: vec![None; total],
            visited: vec![0; total],
            stamp: 0,
        }
    }

    /// Идёт вниз по течению до озера, края карты или уже проложенной реки.
    ///
    /// `None`, если трасса упёрлась в тупик из посещённых клеток.
    fn trace<R: Rng>(
        &mut self,
        start: usize,
        rng: &mut R,
        jitter: f32,
    ) -> Option<(Vec<usize>, RiverExit)> {
        let dims = self.basin.dims;
        self.stamp += 1;
        let stamp = self.stamp;

        let mut path = vec![start];
        self.visited[start] = stamp;
        let mut cur = start;

        for _ in 0..dims.len() {
            let next = match self.basin.flow.downstream(cur, dims) {
                Some(n) if self.visited[n] != stamp => Some(n),
                _ => {
                    let visited = &self.visited;
                    choose_downstream(
                        cur,
                        self.basin.height,
                        dims,
                        |n| visited[n] != stamp,
                        rng,
                        jitter,
                    )
                }
            }?;

            self.visited[next] = stamp;
            path.push(next);
            cur = next;

            let (x, y) = dims.xy(cur);
            if self.basin.lake[cur] {
                return Some((path, RiverExit::Lake));
            }
            if let Some(exit) = self.traced[cur] {
                return Some((path, exit));
            }
            if dims.on_edge(x, y) {
                return Some((path, RiverExit::Edge));
            }
        }

        None
    }

    fn is_terminal(&self, i: usize) -> bool {
        let (x, y) = self.basin.dims.xy(i);
        self.basin.lake[i] || self.traced[i].is_some() || self.basin.dims.on_edge(x, y)
    }
}

/// Выбирает истоки, трассирует, обрезает верховья и сглаживает реки.
///
/// Трасса начинается с первой точки, где накопленный сток не меньше
/// `accum_threshold`. Обрезается только начало, так что последняя точка всегда
/// лежит в озере, на краю карты или на другой реке.
pub fn extract_rivers<R: Rng>(
    basin: RiverBasin<'_>,
    cfg: &RiverSettings,
    rng: &mut R,
) -> Vec<River> {
    let total = basin.dims.len();
    if basin.height.len() != total
        || basin.lake.len() != total
        || basin.flow.accum.len() != total
        || basin.flow.order.len() != total
    {
        return Vec::new();
    }

    let sources = find_river_sources(&basin, cfg);
    let mut tracer = Tracer::new(basin);
    let mut rivers = Vec::with_capacity(cfg.count);

    for src in sources {
        if rivers.len() >= cfg.count {
            break;
        }
        if tracer.traced[src].is_some() {
            continue;
        }

        let Some((path, exit)) = tracer.trace(src, rng, cfg.meander_jitter) else {
            continue;
        };
        let Some(head) = path
            .iter()
            .position(|&i| basin.flow.accum[i] >= cfg.accum_threshold)
        else {
            continue;
        };
        let path = &path[head..];
        if path.len() < cfg.min_length.max(2) {
            continue;
        }
        debug_assert!(path.last().is_some_and(|&i| tracer.is_terminal(i)));

        for &i in path {
            tracer.traced[i].get_or_insert(exit);
        }

        let raw: Vec<(f32, f32)> = path
            .iter()
            .map(|&i| {
                let (x, y) = basin.dims.xy(i);
                (x as f32, y as f32)
            })
            .collect();

        rivers.push(River {
            points: smooth_chaikin(&raw, cfg.smooth_iterations),
            length: path.len(),
            exit,
        });
    }

    log::debug!("rivers: {} accepted", rivers.len());
    rivers
}

/// Сглаживание Чайкина: каждое звено заменяется точками на 25% и 75% его длины.
///
/// Концы линии сохраняются, чтобы река по-прежнему доходила до устья.
#[must_use]
pub fn smooth_chaikin(points: &[(f32, f32)], iterations: usize) -> Vec<(f32, f32)> {
    let mut pts = points.to_vec();
    if pts.len() < 3 {
        return pts;
    }

    for _ in 0..iterations {
        let mut out = Vec::with_capacity(pts.len() * 2);
        out.push(pts[0]);
        for seg in pts.windows(2) {
            let (p, q) = (seg[0], seg[1]);
            out.push((0.75 * p.0 + 0.25 * q.0, 0.75 * p.1 + 0.25 * q.1));
            out.push((0.25 * p.0 + 0.75 * q.0, 0.25 * p.1 + 0.75 * q.1));
        }
        out.push(pts[pts.len() - 1]);
        pts = out;
    }
    pts
}

/// Ширина русла по накопленному стоку
#[must_use]
pub fn river_width(accum: f32, cfg: &RiverSettings) -> f32 {
    let max_width = cfg.max_width.max(1.0);
    (1.0 + cfg.widen_k * accum.max(0.0).ln_1p()).clamp(1.0, max_width)
}

/// Растеризует реки мелкими шагами, штампуя диск радиуса `(width - 1) / 2` в каждой точке.
///
/// Возвращает маску речных клеток.
#[must_use]
pub fn rasterize_rivers(
    rivers: &[River],
    accum: &[f32],
    dims: Dims,
    cfg: &RiverSettings,
) -> Vec<bool> {
    let total = dims.len();
    if total == 0 || accum.len() != total {
        return vec![false; total];
    }

    let mut img: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(dims.w as u32, dims.h as u32, Luma([0]));

    let mut stamp = |px: f32, py: f32| {
        let cx = (px.round().max(0.0) as usize).min(dims.w - 1);
        let cy = (py.round().max(0.0) as usize).min(dims.h - 1);
        let width = river_width(accum[dims.idx(cx, cy)], cfg);
        let radius = ((width - 1.0) * 0.5).max(0.0).round() as i32;
        if radius == 0 {
            img.put_pixel(cx as u32, cy as u32, Luma([255]));
        } else {
            draw_filled_circle_mut(&mut img, (cx as i32, cy as i32), radius, Luma([255u8]));
        }
    };

    for river in rivers {
        if let [only] = river.points.as_slice() {
            stamp(only.0, only.1);
        }
        for seg in river.points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
            let steps = (len / RASTER_STEP).ceil().max(1.0) as usize;
            for s in 0..=steps {
                let t = s as f32 / steps as f32;
                stamp(a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
            }
        }
    }

    img.pixels().map(|p| p[0] > 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow::flow_dir_and_accum;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Конус с вершиной в центре: высота строго убывает к краям
    fn hill(dims: Dims) -> Vec<f32> {
        let cx = dims.w as f32 / 2.0;
        let cy = dims.h as f32 / 2.0;
        let reach = (cx * cx + cy * cy).sqrt() + 1.0;
        (0..dims.len())
            .map(|i| {
                let (x, y) = dims.xy(i);
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                1.0 - d / reach
            })
            .collect()
    }

    fn river_cfg() -> RiverSettings {
        RiverSettings {
            count: 2,
            source_min: 0.5,
            source_spacing: 4.0,
            accum_threshold: 1.0,
            smooth_iterations: 1,
            ..RiverSettings::default()
        }
    }

    #[test]
    fn test_sources_are_spaced_peaks() {
        let dims = Dims::new(20, 20);
        let height = hill(dims);
        let flow = flow_dir_and_accum(&height, dims, 1, 0.35);
        let lake = vec![false; dims.len()];
        let basin = RiverBasin {
            dims,
            height: &height,
            flow: &flow,
            lake: &lake,
        };
        let sources = find_river_sources(&basin, &river_cfg());
        assert_eq!(sources, vec![dims.idx(10, 10)]);
    }

    #[test]
    fn test_river_reaches_edge() {
        let dims = Dims::new(20, 20);
        let height = hill(dims);
        let flow = flow_dir_and_accum(&height, dims, 3, 0.35);
        let lake = vec![false; dims.len()];
        let basin = RiverBasin {
            dims,
            height: &height,
            flow: &flow,
            lake: &lake,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let rivers = extract_rivers(basin, &river_cfg(), &mut rng);

        assert_eq!(rivers.len(), 1);
        let river = &rivers[0];
        assert_eq!(river.exit, RiverExit::Edge);
        let &(lx, ly) = river.points.last().unwrap();
        assert!(dims.on_edge(lx as usize, ly as usize));
        assert_eq!(river.points[0], (10.0, 10.0));
    }

    #[test]
    fn test_headwater_below_threshold_is_trimmed() {
        let dims = Dims::new(20, 20);
        let height = hill(dims);
        let flow = flow_dir_and_accum(&height, dims, 3, 0.35);
        let lake = vec![false; dims.len()];
        let basin = RiverBasin {
            dims,
            height: &height,
            flow: &flow,
            lake: &lake,
        };
        let run = |cfg: &RiverSettings| extract_rivers(basin, cfg, &mut ChaCha8Rng::seed_from_u64(1));

        let full = run(&river_cfg());
        // Вершина собирает только себя, следующая клетка — уже две
        let trimmed = run(&RiverSettings {
            accum_threshold: 2.0,
            ..river_cfg()
        });
        assert_eq!(full.len(), 1);
        assert_eq!(trimmed.len(), 1);
        let head = trimmed[0].points[0];
        assert_ne!(head, (10.0, 10.0));
        assert!(flow.accum[dims.idx(head.0 as usize, head.1 as usize)] >= 2.0);
        assert_eq!(trimmed[0].length, full[0].length - 1);
        assert_eq!(trimmed[0].points.last(), full[0].points.last());

        let unreachable = RiverSettings {
            accum_threshold: 1e6,
            ..river_cfg()
        };
        assert!(run(&unreachable).is_empty());
        let too_short = RiverSettings {
            min_length: 1000,
            ..river_cfg()
        };
        assert!(run(&too_short).is_empty());
    }

    #[test]
    fn test_river_stops_at_lake() {
        let dims = Dims::new(20, 20);
        let height = hill(dims);
        let flow = flow_dir_and_accum(&height, dims, 3, 0.35);
        // Кольцо озера вокруг холма
        let lake: Vec<bool> = (0..dims.len())
            .map(|i| {
                let (x, y) = dims.xy(i);
                let d = (x as i32 - 10).abs().max((y as i32 - 10).abs());
                d == 5
            })
            .collect();
        let basin = RiverBasin {
            dims,
            height: &height,
            flow: &flow,
            lake: &lake,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let rivers = extract_rivers(basin, &river_cfg(), &mut rng);
        assert_eq!(rivers.len(), 1);
        assert_eq!(rivers[0].exit, RiverExit::Lake);
        let &(lx, ly) = rivers[0].points.last().unwrap();
        assert!(lake[dims.idx(lx as usize, ly as usize)]);
    }

    #[test]
    fn test_choose_downstream_escapes_pit() {
        let dims = Dims::new(3, 3);
        let mut height = vec![0.5; 9];
        height[4] = 0.1;
        height[dims.idx(2, 1)] = 0.2;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let next = choose_downstream(4, &height, dims, |_| true, &mut rng, 0.0);
        assert_eq!(next, Some(dims.idx(2, 1)));

        let none = choose_downstream(4, &height, dims, |_| false, &mut rng, 0.0);
        assert_eq!(none, None);
    }

    #[test]
    fn test_chaikin_keeps_endpoints() {
        let pts = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)];
        let once = smooth_chaikin(&pts, 1);
        assert_eq!(once.len(), 6);
        assert_eq!(once[0], (0.0, 0.0));
        assert_eq!(*once.last().unwrap(), (4.0, 4.0));
        assert_eq!(once[1], (1.0, 0.0));
        assert_eq!(once[2], (3.0, 0.0));

        let twice = smooth_chaikin(&pts, 2);
        assert_eq!(twice.len(), 2 + 2 * (once.len() - 1));
        assert_eq!(smooth_chaikin(&pts[..2], 3), pts[..2].to_vec());
    }

    #[test]
    fn test_width_grows_with_flow_and_is_capped() {
        let cfg = RiverSettings::default();
        assert!((river_width(0.0, &cfg) - 1.0).abs() < f32::EPSILON);
        assert!(river_width(50.0, &cfg) > river_width(5.0, &cfg));
        assert!((river_width(1e9, &cfg) - cfg.max_width).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rasterize_thin_and_wide() {
        let dims = Dims::new(12, 9);
        let river = River {
            points: vec![(1.0, 4.0), (10.0, 4.0)],
            length: 10,
            exit: RiverExit::Edge,
        };
        let cfg = RiverSettings::default();

        let thin = rasterize_rivers(std::slice::from_ref(&river), &vec![1.0; dims.len()], dims, &cfg);
        assert!((1..=10).all(|x| thin[dims.idx(x, 4)]));
        assert_eq!(thin.iter().filter(|&&m| m).count(), 10);

        let wide = rasterize_rivers(&[river], &vec![1000.0; dims.len()], dims, &cfg);
        assert!(wide[dims.idx(5, 3)] && wide[dims.idx(5, 5)]);
        assert!(wide.iter().filter(|&&m| m).count() > 10);
    }
}
