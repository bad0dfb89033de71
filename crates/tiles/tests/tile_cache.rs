// Integration tests driving tile nodes through the public loader API.

use bevy_math::{UVec2, Vec2};
use image::{Rgba, RgbaImage};
use mosaic_tiles::prelude::*;

fn sphere_config() -> TileBuilderConfig {
    TileBuilderConfig::for_surface(Surface::new(SurfaceShape::WGS84, Projection::SphericalMercator))
}

fn images(count: usize) -> Vec<TileImage> {
    (0..count)
        .map(|frame| RgbaImage::from_pixel(32, 32, Rgba([frame as u8 * 40, 128, 0, 255])).into())
        .collect()
}

fn address(level: u32, x: u32, y: u32) -> QuadAddress {
    QuadAddress::new(level, x, y).unwrap()
}

fn assert_single_representation(cache: &TileCache) {
    for node in cache
        .nodes()
        .filter(|node| node.is_initialized() && !node.is_placeholder_only())
    {
        for quadrant in Quadrant::ALL {
            assert_eq!(
                node.representation_count(quadrant),
                1,
                "quadrant {quadrant:?} of {} has {:?}",
                node.address(),
                node.coverage(quadrant)
            );
        }

        let Some(parent) = node.address().parent() else {
            continue;
        };
        if let Some(parent) = cache.node(parent).filter(|parent| !parent.is_placeholder_only()) {
            let quadrant = node.address().quadrant().unwrap();
            assert_eq!(
                parent.coverage(quadrant),
                QuadrantCoverage::RealChild,
                "{} is drawn twice",
                node.address()
            );
        }
    }
}

#[test]
fn root_tile_scenario() {
    let builder = TileBuilder::new(sphere_config());
    let geometry = builder
        .build_tile(QuadAddress::ROOT, None, Vec2::ONE, Vec2::ZERO, false)
        .unwrap();

    assert_eq!(geometry.mesh.vertex_count(), 11 * 11 + 2);
    assert_eq!(geometry.mesh.triangle_count(), 2 * 10 * 10 + 2 * 10);

    let skirt = geometry.skirt.unwrap();
    assert_eq!(skirt.triangle_count(), 2 * 4 * 10);
}

#[test]
fn coverage_holds_while_children_arrive_out_of_order() {
    let mut config = sphere_config();
    config.tessellation = UVec2::new(4, 4);
    let mut cache = TileCache::new(TileBuilder::new(config));

    let steps: [(&str, QuadAddress); 8] = [
        ("load", address(2, 3, 3)),
        ("load", QuadAddress::ROOT),
        ("load", address(1, 1, 1)),
        ("placeholder", address(1, 0, 0)),
        ("load", address(1, 0, 1)),
        ("unload", address(1, 1, 1)),
        ("load", address(2, 2, 3)),
        ("load", address(1, 1, 1)),
    ];

    for (step, (action, address)) in steps.into_iter().enumerate() {
        cache.begin_pass(step as f64);

        match action {
            "load" => cache.tile_loaded(address, &images(1), None).unwrap(),
            "placeholder" => cache.tile_loaded(address, &[TileImage::Placeholder], None).unwrap(),
            _ => cache.tile_unloaded(address),
        }

        cache.refresh_parents().unwrap();
        cache.finish_pass();

        assert_single_representation(&cache);
    }

    let root = cache.node(QuadAddress::ROOT).unwrap();
    assert_eq!(root.coverage(Quadrant::SouthWest), QuadrantCoverage::Placeholder);
    assert_eq!(root.coverage(Quadrant::NorthWest), QuadrantCoverage::RealChild);
    assert_eq!(root.coverage(Quadrant::NorthEast), QuadrantCoverage::RealChild);

    let north_east = cache.node(address(1, 1, 1)).unwrap();
    assert_eq!(north_east.coverage(Quadrant::NorthWest), QuadrantCoverage::RealChild);
    assert_eq!(north_east.coverage(Quadrant::NorthEast), QuadrantCoverage::RealChild);
    assert_eq!(north_east.coverage(Quadrant::SouthWest), QuadrantCoverage::Placeholder);
}

#[test]
fn failed_reload_hands_the_quadrant_back_to_the_parent() {
    let mut cache = TileCache::new(TileBuilder::new(sphere_config()));
    let child = address(1, 1, 0);

    cache.tile_loaded(QuadAddress::ROOT, &images(1), None).unwrap();
    cache.tile_loaded(child, &images(1), None).unwrap();
    cache.refresh_parents().unwrap();
    cache.finish_pass();
    assert_eq!(cache.coverage(QuadAddress::ROOT, Quadrant::SouthEast), QuadrantCoverage::RealChild);

    let empty: TileImage = RgbaImage::new(0, 0).into();
    assert!(matches!(
        cache.tile_loaded(child, &[empty], None),
        Err(TileError::TextureBuild { frame: 0, .. })
    ));
    cache.refresh_parents().unwrap();
    cache.finish_pass();

    assert_eq!(cache.child_states(QuadAddress::ROOT)[Quadrant::SouthEast], ChildState::Loading);
    assert_eq!(cache.coverage(QuadAddress::ROOT, Quadrant::SouthEast), QuadrantCoverage::SelfDraw);
    assert_single_representation(&cache);
}

#[test]
fn add_then_clear_restores_atlas_counters() {
    let builder = TileBuilder::new(sphere_config());
    let mut atlas = SharedAtlas::new(AtlasSettings::for_config(builder.config()));
    let mut changes = ChangeSet::new(0.0);

    let mut neighbour = TileNode::new(address(1, 0, 0));
    let mut node = TileNode::new(address(1, 1, 0));

    let mut ctx = TileContext::new(&builder, Some(&mut atlas), &mut changes);
    neighbour
        .add_to_scene(&mut ctx, &images(1), None, AnimationFrames::default())
        .unwrap();
    drop(ctx);
    let before = atlas.counters();

    let mut ctx = TileContext::new(&builder, Some(&mut atlas), &mut changes);
    node.add_to_scene(&mut ctx, &images(1), None, AnimationFrames::default())
        .unwrap();
    node.update_contents(
        &mut ctx,
        QuadrantArray::from_fn(|quadrant| {
            if quadrant == Quadrant::NorthWest {
                ChildState::Ready
            } else {
                ChildState::Loading
            }
        }),
        AnimationFrames::default(),
    )
    .unwrap();
    drop(ctx);
    assert_ne!(atlas.counters(), before);

    let mut ctx = TileContext::new(&builder, Some(&mut atlas), &mut changes);
    node.clear_contents(&mut ctx);
    drop(ctx);

    assert_eq!(atlas.counters(), before);
}

#[test]
fn switching_frames_keeps_geometry_untouched() {
    let mut config = sphere_config();
    config.image_depth = 2;
    let atlas = SharedAtlas::new(AtlasSettings::for_config(&config));
    let mut cache = TileCache::new(TileBuilder::new(config)).with_atlas(atlas);
    let publisher = cache.publisher();

    cache.set_current_images(AnimationFrames::new(0, 1));
    cache.tile_loaded(QuadAddress::ROOT, &images(2), None).unwrap();
    cache.tile_loaded(address(1, 0, 0), &images(2), None).unwrap();
    cache.refresh_parents().unwrap();
    cache.finish_pass();
    let before = publisher.snapshot();

    cache.set_current_images(AnimationFrames::new(1, 0));
    let batch = cache.finish_pass();
    let after = publisher.snapshot();

    assert!(!batch.is_empty());
    assert!(batch
        .iter()
        .all(|request| matches!(request, ChangeRequest::BindTexture { .. })));

    assert_eq!(before.drawables.len(), after.drawables.len());
    for (id, binding) in &after.drawables {
        let previous = &before.drawables[id];

        assert_eq!(binding.vertex_range, previous.vertex_range);
        assert_eq!(binding.index_range, previous.index_range);
        assert_eq!(binding.textures[0], previous.textures[1]);
        assert_eq!(binding.textures[1], previous.textures[0]);
    }
}

#[test]
fn unloading_twice_changes_nothing() {
    let mut cache = TileCache::new(TileBuilder::new(sphere_config()))
        .with_atlas(SharedAtlas::new(AtlasSettings::default()));

    cache.tile_loaded(address(3, 2, 5), &images(1), None).unwrap();
    cache.finish_pass();

    cache.tile_unloaded(address(3, 2, 5));
    assert!(!cache.finish_pass().is_empty());

    cache.tile_unloaded(address(3, 2, 5));
    cache.refresh_parents().unwrap();
    assert!(cache.finish_pass().is_empty());
    assert_eq!(cache.atlas().unwrap().counters(), AtlasCounters::default());
}

#[test]
fn flat_surfaces_skip_skirts_and_caps() {
    let mut config = TileBuilderConfig::for_surface(Surface::plane(1000.0));
    config.line_mode = true;
    let mut cache = TileCache::new(TileBuilder::new(config));

    cache.tile_loaded(address(2, 0, 0), &images(1), None).unwrap();
    let batch = cache.finish_pass();

    let meshes: Vec<_> = batch
        .iter()
        .filter_map(|request| match request {
            ChangeRequest::AddDrawable { mesh, .. } => Some(mesh),
            _ => None,
        })
        .collect();

    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].topology, Topology::Lines);
    assert_eq!(meshes[0].vertex_count(), 121);
}
