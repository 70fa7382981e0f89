//! Плоская индексация тайловой сетки: `idx(x, y) = y * w + x`.

use serde::{Deserialize, Serialize};

/// Смещения 8 соседей. Номер направления — индекс в этом массиве.
pub const DIRS8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

pub const DIRS4: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Размеры карты в тайлах
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dims {
    pub w: usize,
    pub h: usize,
}

impl Dims {
    #[must_use]
    pub fn new(w: usize, h: usize) -> Self {
        Self { w, h }
    }

    /// Число клеток; `0`, если хотя бы одна сторона нулевая.
    #[must_use]
    pub fn len(&self) -> usize {
        self.w * self.h
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[must_use]
    pub fn xy(&self, i: usize) -> (usize, usize) {
        (i % self.w, i / self.w)
    }

    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h
    }

    /// Индекс соседа со смещением `(dx, dy)` или `None` за границей карты.
    #[must_use]
    pub fn offset(&self, x: usize, y: usize, dx: i32, dy: i32) -> Option<usize> {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        self.contains(nx, ny)
            .then(|| self.idx(nx as usize, ny as usize))
    }

    #[must_use]
    pub fn on_edge(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 == self.w || y + 1 == self.h
    }

    /// Центр карты (точка появления по умолчанию).
    #[must_use]
    pub fn center(&self) -> (usize, usize) {
        (self.w / 2, self.h / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idx_xy_bijection() {
        let dims = Dims::new(7, 5);
        for i in 0..dims.len() {
            let (x, y) = dims.xy(i);
            assert_eq!(dims.idx(x, y), i);
        }
    }

    #[test]
    fn test_offset_respects_bounds() {
        let dims = Dims::new(4, 3);
        assert_eq!(dims.offset(0, 0, -1, 0), None);
        assert_eq!(dims.offset(3, 2, 0, 1), None);
        assert_eq!(dims.offset(1, 1, 1, 1), Some(dims.idx(2, 2)));
        assert!(dims.on_edge(0, 1));
        assert!(!dims.on_edge(1, 1));
    }
}
