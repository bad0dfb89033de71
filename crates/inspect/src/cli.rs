use clap::{Args, Parser, Subcommand, ValueEnum};
use mosaic_tiles::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reports the geometry synthesized for a single tile.
    Tile(TileArgs),
    /// Loads every tile down to a level with generated images and reports the
    /// resulting scene changes.
    Load(LoadArgs),
    /// Writes the default builder configuration.
    WriteConfig(WriteConfigArgs),
}

#[derive(Args, Debug)]
pub struct TileArgs {
    pub level: u32,
    pub x: u32,
    pub y: u32,
    /// RON builder configuration, the defaults are used otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Builds the placeholder covering this quadrant instead of the tile.
    #[arg(short, long)]
    pub quadrant: Option<QuadrantArg>,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    #[arg(value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_level: u32,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Packs textures and drawables into a shared atlas.
    #[arg(short, long, default_value_t = false)]
    pub atlas: bool,
    /// Edge length of the generated tile images.
    #[arg(long = "size", default_value_t = 256)]
    pub image_size: u32,
}

#[derive(Args, Debug)]
pub struct WriteConfigArgs {
    pub path: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum QuadrantArg {
    Sw,
    Se,
    Nw,
    Ne,
}

impl From<QuadrantArg> for Quadrant {
    fn from(quadrant: QuadrantArg) -> Self {
        match quadrant {
            QuadrantArg::Sw => Quadrant::SouthWest,
            QuadrantArg::Se => Quadrant::SouthEast,
            QuadrantArg::Nw => Quadrant::NorthWest,
            QuadrantArg::Ne => Quadrant::NorthEast,
        }
    }
}

pub fn load_config(path: Option<&PathBuf>) -> TileResult<TileBuilderConfig> {
    match path {
        Some(path) => TileBuilderConfig::load_file(path),
        None => Ok(TileBuilderConfig::default()),
    }
}
