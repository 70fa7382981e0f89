//! Экспорт карты и полей в PNG для отладки.
//!
//! Тайлы рисуются цветами из [`Tile::to_rgb`], скалярные поля `[0, 1]` — в
//! оттенках серого. Отмытая карта получается умножением цвета тайла на отмывку.

use std::path::Path;

use image::{ImageBuffer, Luma, Rgb};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::biome::Tile;
use crate::error::{Error, Result};
use crate::grid::Dims;

/// Преобразует тайлы в плоский RGB-буфер `[R, G, B, R, G, B, ...]`
#[must_use]
pub fn tiles_to_rgb(tiles: &[Tile]) -> Vec<u8> {
    tiles.iter().flat_map(Tile::to_rgb).collect()
}

/// Цвет тайла, умноженный на освещённость
#[must_use]
pub fn shaded_tiles_to_rgb(tiles: &[Tile], shade: &[f32]) -> Vec<u8> {
    tiles
        .iter()
        .zip(shade)
        .flat_map(|(tile, &s)| {
            let s = s.clamp(0.0, 1.0);
            tile.to_rgb().map(|c| (f32::from(c) * s).round() as u8)
        })
        .collect()
}

/// Переводит поле `[0, 1]` в байты яркости; значения вне диапазона обрезаются
#[must_use]
pub fn field_to_grayscale(field: &[f32]) -> Vec<u8> {
    let to_byte = |&v: &f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    #[cfg(feature = "parallel")]
    let bytes = field.par_iter().map(to_byte).collect();
    #[cfg(not(feature = "parallel"))]
    let bytes = field.iter().map(to_byte).collect();

    bytes
}

fn image_size(dims: Dims) -> Result<(u32, u32)> {
    let w = u32::try_from(dims.w).map_err(|_| Error::Buffer(format!("width {} too large", dims.w)))?;
    let h = u32::try_from(dims.h).map_err(|_| Error::Buffer(format!("height {} too large", dims.h)))?;
    Ok((w, h))
}

/// `ImageBuffer::from_raw` отвергает только слишком короткий буфер, поэтому длину сверяем сами
fn check_len(len: usize, dims: Dims, what: &str) -> Result<()> {
    if len == dims.len() {
        Ok(())
    } else {
        Err(Error::Buffer(format!(
            "{what} has {len} cells, {}x{} map needs {}",
            dims.w,
            dims.h,
            dims.len()
        )))
    }
}

fn save_rgb(raw: Vec<u8>, dims: Dims, path: &Path) -> Result<()> {
    let (w, h) = image_size(dims)?;
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_raw(w, h, raw)
        .ok_or_else(|| Error::Buffer(format!("buffer does not match {w}x{h} RGB image")))?;
    img.save(path)?;
    Ok(())
}

/// Сохраняет карту тайлов
pub fn save_tiles(tiles: &[Tile], dims: Dims, path: impl AsRef<Path>) -> Result<()> {
    check_len(tiles.len(), dims, "tiles")?;
    save_rgb(tiles_to_rgb(tiles), dims, path.as_ref())
}

/// Сохраняет карту тайлов с отмывкой рельефа
pub fn save_shaded_tiles(
    tiles: &[Tile],
    shade: &[f32],
    dims: Dims,
    path: impl AsRef<Path>,
) -> Result<()> {
    check_len(tiles.len(), dims, "tiles")?;
    check_len(shade.len(), dims, "shade")?;
    save_rgb(shaded_tiles_to_rgb(tiles, shade), dims, path.as_ref())
}

/// Сохраняет скалярное поле (высоту, влажность, отмывку) в оттенках серого
pub fn save_field(field: &[f32], dims: Dims, path: impl AsRef<Path>) -> Result<()> {
    check_len(field.len(), dims, "field")?;
    let (w, h) = image_size(dims)?;
    let img: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(w, h, field_to_grayscale(field))
            .ok_or_else(|| Error::Buffer(format!("field does not match {w}x{h} image")))?;
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_clamps() {
        assert_eq!(field_to_grayscale(&[-1.0, 0.0, 0.5, 1.0, 2.0]), vec![0, 0, 128, 255, 255]);
    }

    #[test]
    fn test_shading_darkens_palette() {
        let rgb = shaded_tiles_to_rgb(&[Tile::Snow, Tile::Snow], &[1.0, 0.0]);
        assert_eq!(&rgb[..3], &Tile::Snow.to_rgb());
        assert_eq!(&rgb[3..], &[0, 0, 0]);
    }

    #[test]
    fn test_save_and_reload_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.png");
        let dims = Dims::new(3, 2);
        let tiles = [Tile::Grass, Tile::Water, Tile::Rock, Tile::Sand, Tile::Snow, Tile::Marsh];
        save_tiles(&tiles, dims, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(1, 0).0, Tile::Water.to_rgb());
        assert_eq!(img.get_pixel(2, 1).0, Tile::Marsh.to_rgb());
    }

    #[test]
    fn test_mismatched_field_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_field(&[0.5; 5], Dims::new(2, 2), dir.path().join("f.png")).unwrap_err();
        assert!(matches!(err, Error::Buffer(_)));
        let err = save_field(&[0.5; 3], Dims::new(2, 2), dir.path().join("f.png")).unwrap_err();
        assert!(matches!(err, Error::Buffer(_)));
        assert!(!dir.path().join("f.png").exists());
    }

    #[test]
    fn test_mismatched_tiles_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dims = Dims::new(2, 2);
        let tiles = [Tile::Grass; 5];
        let err = save_tiles(&tiles, dims, dir.path().join("t.png")).unwrap_err();
        assert!(matches!(err, Error::Buffer(_)));

        let err = save_shaded_tiles(&tiles, &[1.0; 5], dims, dir.path().join("s.png")).unwrap_err();
        assert!(matches!(err, Error::Buffer(_)));
        let err = save_shaded_tiles(&tiles[..4], &[1.0; 5], dims, dir.path().join("s.png"))
            .unwrap_err();
        assert!(matches!(err, Error::Buffer(_)));
    }
}
