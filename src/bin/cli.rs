use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tilegen::{Dims, GeneratorParams, generate_terrain_with_report, png};

/// Генератор тайловых миров для поселенческой игры
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML (по умолчанию — встроенные параметры)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Сид генератора (перекрывает значение из конфигурации)
    #[arg(short, long)]
    seed: Option<u32>,

    /// Ширина карты в тайлах
    #[arg(long)]
    width: Option<usize>,

    /// Высота карты в тайлах
    #[arg(long)]
    height: Option<usize>,

    /// Каталог для PNG и отчёта
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => {
            log::info!("Загрузка конфигурации из {}", path.display());
            GeneratorParams::from_toml_file(path)?
        }
        None => GeneratorParams::default(),
    };
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    if let Some(width) = cli.width {
        params.width = width;
    }
    if let Some(height) = cli.height {
        params.height = height;
    }

    let dims = Dims::new(params.width, params.height);
    log::info!(
        "Генерация мира {}×{} (сид {})...",
        dims.w,
        dims.h,
        params.seed
    );
    let (world, report) = generate_terrain_with_report(params.seed, &params.terrain, dims);
    log::info!("{}", report.summary());
    if !report.all_rivers_terminated() {
        log::warn!(
            "{} из {} рек не доходят до озера, края карты или другой реки",
            report.rivers - report.rivers_terminated,
            report.rivers
        );
    }

    if dims.is_empty() {
        log::warn!("Пустая карта, файлы не записываются");
        return Ok(());
    }

    fs::create_dir_all(&cli.out_dir)?;
    let out = |name: &str| cli.out_dir.join(name);

    let shade = world.hillshade(&params.shading);
    png::save_tiles(&world.tiles, dims, out("tiles.png"))?;
    png::save_field(world.aux.height(), dims, out("height.png"))?;
    png::save_field(world.aux.moisture(), dims, out("moisture.png"))?;
    png::save_field(&shade, dims, out("hillshade.png"))?;
    png::save_shaded_tiles(&world.tiles, &shade, dims, out("shaded.png"))?;
    fs::write(out("report.json"), serde_json::to_string_pretty(&report)?)?;

    log::info!("Готово! Файлы сохранены в {}", cli.out_dir.display());
    Ok(())
}
