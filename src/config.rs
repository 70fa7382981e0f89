// src/config.rs
//! Конфигурация генерации мира
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией тайлового мира:
//! - Частоты шума и искажение координат (domain warping)
//! - Озёра и реки
//! - Доля скал и плотность месторождений камня
//! - Плодородные участки, ягодники и леса
//! - Зона появления и освещение рельефа
//!
//! Все структуры поддерживают сериализацию в TOML/JSON; любое поле можно опустить.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Источник градиентного шума для полей высоты и влажности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoiseBackend {
    /// Собственный шум с 8 градиентами и таблицей перестановок на `mulberry32`.
    /// Побитово воспроизводим между платформами.
    #[default]
    Gradient8,
    /// `OpenSimplex2` из `fastnoise-lite`, один октав; фрактальную сумму делает `fbm2d`.
    OpenSimplex2,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoiseSettings {
    #[serde(default)]
    pub backend: NoiseBackend,
}

/// Озёра: порог заливки и допустимые размеры котловин
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterSettings {
    /// Клетки ниже этой высоты — кандидаты в озёра
    #[serde(default = "default_water_level")]
    pub level: f32,

    /// Котловины меньше этого размера считаются шумом
    #[serde(default = "default_min_lake_size")]
    pub min_lake_size: usize,

    /// Котловины больше этого размера (обычно низины у края карты) не заливаются
    #[serde(default = "default_max_lake_size")]
    pub max_lake_size: usize,

    /// Прибавка влажности у самого берега озера
    #[serde(default = "default_moisture_boost")]
    pub moisture_boost: f32,

    /// Радиус (в тайлах) действия прибавки влажности
    #[serde(default = "default_boost_radius")]
    pub boost_radius: usize,
}

fn default_water_level() -> f32 {
    0.3
}
fn default_min_lake_size() -> usize {
    6
}
fn default_max_lake_size() -> usize {
    420
}
fn default_moisture_boost() -> f32 {
    0.18
}
fn default_boost_radius() -> usize {
    3
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self {
            level: default_water_level(),
            min_lake_size: default_min_lake_size(),
            max_lake_size: default_max_lake_size(),
            moisture_boost: default_moisture_boost(),
            boost_radius: default_boost_radius(),
        }
    }
}

/// Реки: выбор истоков, трассировка, сглаживание и ширина
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiverSettings {
    /// Желаемое число рек
    #[serde(default = "default_river_count")]
    pub count: usize,

    /// Минимальная высота истока
    #[serde(default = "default_source_min")]
    pub source_min: f32,

    /// Минимальное расстояние между истоками (в тайлах)
    #[serde(default = "default_source_spacing")]
    pub source_spacing: f32,

    /// Река начинается с первой точки, где накопленный сток не меньше порога
    #[serde(default = "default_accum_threshold")]
    pub accum_threshold: f32,

    /// Сила детерминированного дрожания при выборе направления стока
    #[serde(default = "default_meander_jitter")]
    pub meander_jitter: f32,

    /// Число итераций сглаживания Чайкина
    #[serde(default = "default_smooth_iterations")]
    pub smooth_iterations: usize,

    /// Максимальная ширина русла в тайлах
    #[serde(default = "default_max_width")]
    pub max_width: f32,

    /// Коэффициент расширения: `width = 1 + widen_k * ln(1 + accum)`
    #[serde(default = "default_widen_k")]
    pub widen_k: f32,

    /// Реки короче этого числа точек (после обрезки истока) отбрасываются
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

fn default_river_count() -> usize {
    4
}
fn default_source_min() -> f32 {
    0.55
}
fn default_source_spacing() -> f32 {
    10.0
}
fn default_accum_threshold() -> f32 {
    6.0
}
fn default_meander_jitter() -> f32 {
    0.35
}
fn default_smooth_iterations() -> usize {
    2
}
fn default_max_width() -> f32 {
    4.0
}
fn default_widen_k() -> f32 {
    0.45
}
fn default_min_length() -> usize {
    3
}

impl Default for RiverSettings {
    fn default() -> Self {
        Self {
            count: default_river_count(),
            source_min: default_source_min(),
            source_spacing: default_source_spacing(),
            accum_threshold: default_accum_threshold(),
            meander_jitter: default_meander_jitter(),
            smooth_iterations: default_smooth_iterations(),
            max_width: default_max_width(),
            widen_k: default_widen_k(),
            min_length: default_min_length(),
        }
    }
}

/// Скалы и месторождения камня
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RockSettings {
    /// Целевая доля тайлов `Rock` от всей карты
    #[serde(default = "default_target_ratio")]
    pub target_ratio: f32,

    /// Вероятность месторождения на каждом тайле скалы
    #[serde(default = "default_p_on_rock")]
    pub p_on_rock: f32,

    /// Вероятность, что месторождение «перетечёт» одной единицей на соседнюю скалу
    #[serde(default = "default_blob_chance")]
    pub blob_chance: f32,

    /// Гарантированный минимум месторождений на карте
    #[serde(default = "default_ensure_min_deposits")]
    pub ensure_min_deposits: usize,

    /// Начальный порог высоты для скал (уточняется калибровкой)
    #[serde(default = "default_initial_height")]
    pub initial_height: f32,

    /// Начальный порог уклона для скал (уточняется калибровкой)
    #[serde(default = "default_initial_slope")]
    pub initial_slope: f32,
}

fn default_target_ratio() -> f32 {
    0.08
}
fn default_p_on_rock() -> f32 {
    0.12
}
fn default_blob_chance() -> f32 {
    0.35
}
fn default_ensure_min_deposits() -> usize {
    6
}
fn default_initial_height() -> f32 {
    0.72
}
fn default_initial_slope() -> f32 {
    0.06
}

impl Default for RockSettings {
    fn default() -> Self {
        Self {
            target_ratio: default_target_ratio(),
            p_on_rock: default_p_on_rock(),
            blob_chance: default_blob_chance(),
            ensure_min_deposits: default_ensure_min_deposits(),
            initial_height: default_initial_height(),
            initial_slope: default_initial_slope(),
        }
    }
}

/// Пороги классификации биомов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeSettings {
    #[serde(default = "default_snow_height")]
    pub snow_height: f32,

    /// На берегу: влажность ниже — песок, выше — болото
    #[serde(default = "default_sand_marsh_moisture")]
    pub sand_marsh_moisture: f32,

    #[serde(default = "default_meadow_max_slope")]
    pub meadow_max_slope: f32,

    #[serde(default = "default_meadow_moisture_min")]
    pub meadow_moisture_min: f32,

    #[serde(default = "default_meadow_moisture_max")]
    pub meadow_moisture_max: f32,

    /// Влажность, начиная с которой трава и луг становятся плодородными
    #[serde(default = "default_fertile_moisture")]
    pub fertile_moisture: f32,

    #[serde(default = "default_fertile_max_height")]
    pub fertile_max_height: f32,
}

fn default_snow_height() -> f32 {
    0.82
}
fn default_sand_marsh_moisture() -> f32 {
    0.6
}
fn default_meadow_max_slope() -> f32 {
    0.02
}
fn default_meadow_moisture_min() -> f32 {
    0.35
}
fn default_meadow_moisture_max() -> f32 {
    0.6
}
fn default_fertile_moisture() -> f32 {
    0.64
}
fn default_fertile_max_height() -> f32 {
    0.7
}

impl Default for BiomeSettings {
    fn default() -> Self {
        Self {
            snow_height: default_snow_height(),
            sand_marsh_moisture: default_sand_marsh_moisture(),
            meadow_max_slope: default_meadow_max_slope(),
            meadow_moisture_min: default_meadow_moisture_min(),
            meadow_moisture_max: default_meadow_moisture_max(),
            fertile_moisture: default_fertile_moisture(),
            fertile_max_height: default_fertile_max_height(),
        }
    }
}

/// Плодородные участки и ягодники
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FertileSettings {
    /// Участки меньше этой площади возвращаются в траву
    #[serde(default = "default_area_min")]
    pub area_min: usize,

    /// Участки больше этой площади обтачиваются по контуру
    #[serde(default = "default_area_max")]
    pub area_max: usize,

    /// Число проходов скругления краёв
    #[serde(default = "default_edge_feather")]
    pub edge_feather: usize,

    /// Базовая вероятность куста в центре ягодника
    #[serde(default = "default_berry_base_p")]
    pub berry_base_p: f32,

    /// Число центров ягодников на 1000 тайлов карты
    #[serde(default = "default_cluster_centers_per_1k")]
    pub cluster_centers_per_1k: f32,

    #[serde(default = "default_cluster_radius")]
    pub cluster_radius: f32,
}

fn default_area_min() -> usize {
    12
}
fn default_area_max() -> usize {
    160
}
fn default_edge_feather() -> usize {
    1
}
fn default_berry_base_p() -> f32 {
    0.55
}
fn default_cluster_centers_per_1k() -> f32 {
    1.2
}
fn default_cluster_radius() -> f32 {
    3.0
}

impl Default for FertileSettings {
    fn default() -> Self {
        Self {
            area_min: default_area_min(),
            area_max: default_area_max(),
            edge_feather: default_edge_feather(),
            berry_base_p: default_berry_base_p(),
            cluster_centers_per_1k: default_cluster_centers_per_1k(),
            cluster_radius: default_cluster_radius(),
        }
    }
}

/// Леса: расстановка центров и гауссовы «пятна»
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestSettings {
    /// Минимальное расстояние между центрами лесов
    #[serde(default = "default_forest_spacing")]
    pub spacing: f32,

    /// Радиус пятна леса
    #[serde(default = "default_forest_radius")]
    pub radius: f32,

    /// Минимальная влажность в центре леса
    #[serde(default = "default_center_moisture")]
    pub center_moisture: f32,

    /// Клетки суше этого значения лес пропускает
    #[serde(default = "default_forest_min_moisture")]
    pub min_moisture: f32,

    /// Порог интенсивности, выше которого клетка становится лесом
    #[serde(default = "default_forest_threshold")]
    pub threshold: f32,

    /// Множитель вероятности одиночного дерева на опушке
    #[serde(default = "default_fringe_chance")]
    pub fringe_chance: f32,
}

fn default_forest_spacing() -> f32 {
    9.0
}
fn default_forest_radius() -> f32 {
    6.0
}
fn default_center_moisture() -> f32 {
    0.45
}
fn default_forest_min_moisture() -> f32 {
    0.36
}
fn default_forest_threshold() -> f32 {
    0.12
}
fn default_fringe_chance() -> f32 {
    0.35
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            spacing: default_forest_spacing(),
            radius: default_forest_radius(),
            center_moisture: default_center_moisture(),
            min_moisture: default_forest_min_moisture(),
            threshold: default_forest_threshold(),
            fringe_chance: default_fringe_chance(),
        }
    }
}

/// Зона появления поселенцев в центре карты
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnSettings {
    #[serde(default = "default_spawn_enabled")]
    pub enabled: bool,

    #[serde(default = "default_spawn_radius")]
    pub radius: usize,
}

fn default_spawn_enabled() -> bool {
    true
}
fn default_spawn_radius() -> usize {
    4
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            enabled: default_spawn_enabled(),
            radius: default_spawn_radius(),
        }
    }
}

/// Полный набор параметров рельефа, гидрологии, биомов и ресурсов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Базовая частота шума высот
    #[serde(default = "default_height_scale")]
    pub height_scale: f32,

    /// Базовая частота шума влажности
    #[serde(default = "default_moisture_scale")]
    pub moisture_scale: f32,

    /// Частота поля искажения координат влажности
    #[serde(default = "default_warp_scale")]
    pub warp_scale: f32,

    /// Амплитуда искажения (в тайлах)
    #[serde(default = "default_warp_amp")]
    pub warp_amp: f32,

    #[serde(default)]
    pub noise: NoiseSettings,

    #[serde(default)]
    pub water: WaterSettings,

    #[serde(default)]
    pub rivers: RiverSettings,

    #[serde(default)]
    pub rock: RockSettings,

    #[serde(default)]
    pub biome: BiomeSettings,

    #[serde(default)]
    pub fertile: FertileSettings,

    #[serde(default)]
    pub forest: ForestSettings,

    #[serde(default)]
    pub spawn: SpawnSettings,
}

fn default_height_scale() -> f32 {
    0.045
}
fn default_moisture_scale() -> f32 {
    0.05
}
fn default_warp_scale() -> f32 {
    0.03
}
fn default_warp_amp() -> f32 {
    6.5
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_scale: default_height_scale(),
            moisture_scale: default_moisture_scale(),
            warp_scale: default_warp_scale(),
            warp_amp: default_warp_amp(),
            noise: NoiseSettings::default(),
            water: WaterSettings::default(),
            rivers: RiverSettings::default(),
            rock: RockSettings::default(),
            biome: BiomeSettings::default(),
            fertile: FertileSettings::default(),
            forest: ForestSettings::default(),
            spawn: SpawnSettings::default(),
        }
    }
}

/// Параметры отмывки рельефа (hillshade) для рендерера
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShadingConfig {
    /// Фоновая освещённость, `[0, 1]`
    #[serde(default = "default_ambient")]
    pub ambient: f32,

    /// Вклад направленного света, `[0, 1]`
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

fn default_ambient() -> f32 {
    0.55
}
fn default_intensity() -> f32 {
    0.45
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            ambient: default_ambient(),
            intensity: default_intensity(),
        }
    }
}

/// Основные параметры генерации мира
///
/// Полная конфигурация для генерации одного мира из CLI. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorParams {
    /// Сид генератора (детерминированная генерация)
    #[serde(default)]
    pub seed: u32,

    /// Ширина карты в тайлах (по умолчанию 128)
    #[serde(default = "default_width")]
    pub width: usize,

    /// Высота карты в тайлах (по умолчанию 128)
    #[serde(default = "default_height")]
    pub height: usize,

    #[serde(default)]
    pub terrain: TerrainConfig,

    #[serde(default)]
    pub shading: ShadingConfig,
}

fn default_width() -> usize {
    128
}
fn default_height() -> usize {
    128
}

impl GeneratorParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// seed = 42
    /// width = 96
    ///
    /// [terrain.rivers]
    /// count = 6
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        Ok(params)
    }
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            seed: 0,
            width: default_width(),
            height: default_height(),
            terrain: TerrainConfig::default(),
            shading: ShadingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let params: GeneratorParams = toml::from_str(
            r#"
            seed = 7
            [terrain.rivers]
            count = 9
            "#,
        )
        .unwrap();
        assert_eq!(params.seed, 7);
        assert_eq!(params.width, 128);
        assert_eq!(params.terrain.rivers.count, 9);
        assert_eq!(params.terrain.rivers.smooth_iterations, 2);
        assert!((params.terrain.rock.target_ratio - 0.08).abs() < f32::EPSILON);
        assert_eq!(params.terrain.noise.backend, NoiseBackend::Gradient8);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed = 99\nwidth = 32\nheight = 24").unwrap();
        writeln!(file, "[terrain.noise]\nbackend = \"OpenSimplex2\"").unwrap();
        writeln!(file, "[shading]\nambient = 0.3").unwrap();

        let params = GeneratorParams::from_toml_file(file.path()).unwrap();
        assert_eq!(params.seed, 99);
        assert_eq!((params.width, params.height), (32, 24));
        assert_eq!(params.terrain.noise.backend, NoiseBackend::OpenSimplex2);
        assert!((params.shading.ambient - 0.3).abs() < f32::EPSILON);
        assert!((params.shading.intensity - 0.45).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(GeneratorParams::from_toml_file("/nonexistent/world.toml").is_err());
    }
}
