use std::collections::VecDeque;

use crate::grid::{DIRS4, DIRS8, Dims};

/// Маска озёр и число залитых котловин
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LakeMap {
    pub mask: Vec<bool>,
    pub count: usize,
}

/// Находит котловины ниже `threshold` и заливает те, чей размер в `[min_size, max_size]`.
///
/// Заливка 4-связная, на явном стеке индексов (без рекурсии). Слишком мелкие ямы
/// отбрасываются как шум, слишком крупные (низины у края карты) — как не-озёра.
#[must_use]
pub fn flood_fill_basins(
    height: &[f32],
    dims: Dims,
    threshold: f32,
    min_size: usize,
    max_size: usize,
) -> LakeMap {
    let total = dims.len();
    let mut mask = vec![false; total];
    if height.len() != total {
        return LakeMap { mask, count: 0 };
    }

    let mut visited = vec![false; total];
    let mut stack: Vec<usize> = Vec::with_capacity(total);
    let mut region: Vec<usize> = Vec::new();
    let mut count = 0;

    for start in 0..total {
        if visited[start] || height[start] >= threshold {
            continue;
        }

        region.clear();
        visited[start] = true;
        stack.push(start);

        while let Some(i) = stack.pop() {
            region.push(i);
            let (x, y) = dims.xy(i);
            for &(dx, dy) in &DIRS4 {
                if let Some(n) = dims.offset(x, y, dx, dy) {
                    if !visited[n] && height[n] < threshold {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        if (min_size..=max_size).contains(&region.len()) {
            for &i in &region {
                mask[i] = true;
            }
            count += 1;
        }
    }

    LakeMap { mask, count }
}

/// Берег: не-водные клетки, у которых среди 8 соседей есть вода
#[must_use]
pub fn shoreline_mask(water: &[bool], dims: Dims) -> Vec<bool> {
    let total = dims.len();
    if water.len() != total {
        return vec![false; total];
    }

    (0..total)
        .map(|i| {
            if water[i] {
                return false;
            }
            let (x, y) = dims.xy(i);
            DIRS8
                .iter()
                .filter_map(|&(dx, dy)| dims.offset(x, y, dx, dy))
                .any(|n| water[n])
        })
        .collect()
}

/// Увлажняет клетки в радиусе `radius` (4-связное расстояние) от озёр.
///
/// Прибавка линейно убывает: `boost * (1 - d / (radius + 1))`. Результат не выходит за 1.
pub fn boost_moisture_near_lakes(
    moisture: &mut [f32],
    lake: &[bool],
    dims: Dims,
    boost: f32,
    radius: usize,
) {
    let total = dims.len();
    if moisture.len() != total || lake.len() != total || radius == 0 {
        return;
    }

    let mut dist = vec![usize::MAX; total];
    let mut queue = VecDeque::new();
    for (i, &is_lake) in lake.iter().enumerate() {
        if is_lake {
            dist[i] = 0;
            queue.push_back(i);
        }
    }

    while let Some(i) = queue.pop_front() {
        let d = dist[i];
        if d >= radius {
            continue;
        }
        let (x, y) = dims.xy(i);
        for &(dx, dy) in &DIRS4 {
            if let Some(n) = dims.offset(x, y, dx, dy) {
                if dist[n] == usize::MAX {
                    dist[n] = d + 1;
                    queue.push_back(n);
                }
            }
        }
    }

    let span = (radius + 1) as f32;
    for (m, &d) in moisture.iter_mut().zip(&dist) {
        if d >= 1 && d <= radius {
            *m = (*m + boost * (1.0 - d as f32 / span)).clamp(0.0, 1.0);
        }
    }
}
