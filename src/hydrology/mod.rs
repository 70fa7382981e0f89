//! Гидрология: озёра, уклоны, сток и реки.

pub mod flow;
pub mod lakes;
pub mod rivers;

pub use flow::{FlowField, NO_FLOW, compute_slope, flow_dir_and_accum, hash3};
pub use lakes::{LakeMap, boost_moisture_near_lakes, flood_fill_basins, shoreline_mask};
pub use rivers::{River, RiverBasin, RiverExit, extract_rivers, rasterize_rivers, smooth_chaikin};

use crate::grid::Dims;

/// Производные водные маски. Во внешний результат не попадают.
#[derive(Debug, Clone)]
pub struct WaterMasks {
    pub lake: Vec<bool>,
    pub river: Vec<bool>,
    /// Озёра и реки вместе
    pub water: Vec<bool>,
    pub shoreline: Vec<bool>,
}

impl WaterMasks {
    /// Собирает маски; река никогда не снимает отметку озера.
    #[must_use]
    pub fn new(lake: Vec<bool>, river: Vec<bool>, dims: Dims) -> Self {
        let total = dims.len();
        let lake = if lake.len() == total { lake } else { vec![false; total] };
        let river = if river.len() == total { river } else { vec![false; total] };
        let water: Vec<bool> = lake.iter().zip(&river).map(|(&l, &r)| l || r).collect();
        let shoreline = shoreline_mask(&water, dims);
        Self {
            lake,
            river,
            water,
            shoreline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_is_union_and_lake_kept() {
        let dims = Dims::new(3, 1);
        let masks = WaterMasks::new(vec![true, false, false], vec![true, true, false], dims);
        assert_eq!(masks.water, vec![true, true, false]);
        assert!(masks.lake[0]);
        assert_eq!(masks.shoreline, vec![false, false, true]);
    }
}
