mod cli;

use crate::cli::{Cli, Command, LoadArgs, TileArgs, WriteConfigArgs, load_config};
use bevy_math::Vec2;
use clap::Parser;
use image::{Rgba, RgbaImage};
use mosaic_tiles::prelude::*;
use std::collections::BTreeMap;

fn main() -> TileResult<()> {
    let args = Cli::parse();

    match args.command {
        Command::Tile(args) => inspect_tile(args),
        Command::Load(args) => load(args),
        Command::WriteConfig(args) => write_config(args),
    }
}

fn inspect_tile(args: TileArgs) -> TileResult<()> {
    let builder = TileBuilder::new(load_config(args.config.as_ref())?);
    let address = QuadAddress::new(args.level, args.x, args.y).ok_or(TileError::InvalidAddress(
        QuadAddress {
            level: args.level,
            x: args.x,
            y: args.y,
        },
    ))?;

    let geometry = match args.quadrant.map(Quadrant::from) {
        Some(quadrant) => {
            let (dx, dy) = quadrant.offset();
            builder.build_tile(
                address.child(quadrant),
                Some(address),
                Vec2::splat(0.5),
                Vec2::new(dx as f32, dy as f32) * 0.5,
                false,
            )
        }
        None => builder.build_tile(address, None, Vec2::ONE, Vec2::ZERO, false),
    };

    let Some(TileGeometry { mesh, skirt }) = geometry else {
        println!("{address} lies outside of the clip extents.");
        return Ok(());
    };

    println!("tile {} ({:?})", mesh.address, mesh.topology);
    println!("  tessellation: {}", builder.tessellation(mesh.address));
    println!("  vertices:     {}", mesh.vertex_count());
    println!("  primitives:   {}", mesh.primitive_count());
    println!("  center:       {:.6}", mesh.center);
    println!("  approx size:  {:.6}", mesh.approx_size);

    match skirt {
        Some(skirt) => println!(
            "  skirt:        {} vertices, {} triangles",
            skirt.vertex_count(),
            skirt.triangle_count()
        ),
        None => println!("  skirt:        none"),
    }

    Ok(())
}

fn load(args: LoadArgs) -> TileResult<()> {
    let config = load_config(args.config.as_ref())?;
    let settings = AtlasSettings::for_config(&config);
    let depth = config.image_depth.max(1) as usize;

    let mut cache = TileCache::new(TileBuilder::new(config));
    if args.atlas {
        cache = cache.with_atlas(SharedAtlas::new(settings));
    }

    for level in 0..=args.max_level {
        cache.begin_pass(level as f64);

        let count = 1 << level;
        for y in 0..count {
            for x in 0..count {
                let images: Vec<_> = (0..depth)
                    .map(|frame| checkerboard(args.image_size, level, frame))
                    .collect();
                let address = QuadAddress { level, x, y };

                cache.tile_loaded(address, &images, None)?;
            }
        }

        cache.refresh_parents()?;
        let batch = cache.finish_pass();

        println!("level {level}: {} changes", batch.len());
        for (kind, count) in summarize(&batch) {
            println!("  {kind:<16} {count}");
        }

        if let Some(atlas) = cache.atlas() {
            println!("  atlas:           {:?}", atlas.counters());
        }

        if !cache.is_ready() {
            println!("  waiting for new shared buffers to be swapped in");
            cache.publisher().complete_swap();
        }
    }

    Ok(())
}

fn write_config(args: WriteConfigArgs) -> TileResult<()> {
    TileBuilderConfig::default().save_file(&args.path)?;
    println!("wrote default config to {}", args.path.display());

    Ok(())
}

fn checkerboard(size: u32, level: u32, frame: usize) -> TileImage {
    let shade = (level * 24 + frame as u32 * 64).min(255) as u8;

    RgbaImage::from_fn(size.max(1), size.max(1), |x, y| {
        if (x / 16 + y / 16) % 2 == 0 {
            Rgba([shade, 255 - shade, 128, 255])
        } else {
            Rgba([255 - shade, shade, 64, 255])
        }
    })
    .into()
}

fn summarize(batch: &[ChangeRequest]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();

    for request in batch {
        let kind = match request {
            ChangeRequest::AddTexture { .. } => "add texture",
            ChangeRequest::WriteTexture { .. } => "write texture",
            ChangeRequest::RemoveTexture { .. } => "remove texture",
            ChangeRequest::AddDrawable { .. } => "add drawable",
            ChangeRequest::RemoveDrawable { .. } => "remove drawable",
            ChangeRequest::AddBuffer { .. } => "add buffer",
            ChangeRequest::WriteBuffer { .. } => "write buffer",
            ChangeRequest::ClearBuffer { .. } => "clear buffer",
            ChangeRequest::RemoveBuffer { .. } => "remove buffer",
            ChangeRequest::BindTexture { .. } => "bind texture",
            ChangeRequest::OnOff { .. } => "on/off",
            ChangeRequest::Fade { .. } => "fade",
            ChangeRequest::ShaderValue { .. } => "shader value",
        };

        *counts.entry(kind).or_default() += 1;
    }

    counts
}
