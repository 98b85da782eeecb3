use super::*;
use euclid::vec3;
use pretty_assertions::assert_eq;

fn palette() -> Vec<dot_vox::Color> {
    let mut palette = vec![
        dot_vox::Color {
            r: 0x80,
            g: 0x80,
            b: 0x80,
            a: 255
        };
        256
    ];
    palette[0] = dot_vox::Color {
        r: 255,
        g: 0,
        b: 0,
        a: 255,
    };
    palette[1] = dot_vox::Color {
        r: 0,
        g: 0,
        b: 255,
        a: 255,
    };
    palette
}

fn voxel(x: u8, y: u8, z: u8, i: u8) -> dot_vox::Voxel {
    dot_vox::Voxel { x, y, z, i }
}

fn data(models: Vec<dot_vox::Model>) -> dot_vox::DotVoxData {
    dot_vox::DotVoxData {
        version: 150,
        models,
        palette: palette(),
        materials: Vec::new(),
        scenes: Vec::new(),
        layers: Vec::new(),
    }
}

fn dict(entries: &[(&str, &str)]) -> dot_vox::Dict {
    entries
        .iter()
        .map(|&(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

fn small_model() -> dot_vox::Model {
    dot_vox::Model {
        size: dot_vox::Size { x: 10, y: 3, z: 17 },
        voxels: vec![voxel(1, 2, 0, 0), voxel(9, 0, 16, 1)],
    }
}

#[test]
fn model_becomes_world_with_swapped_axes() {
    let mut scene = Scene::new();
    let summary = import_dot_vox_data(&mut scene, &data(vec![small_model()])).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            world_indices: vec![0],
            voxel_count: 2,
            new_materials: 0,
        }
    );

    let world = scene.world(0).unwrap();
    assert_eq!(world.grid_size(), GridSize::new(2, 3, 1));
    assert_eq!(world.get([1, 0, 2]), PackedVoxel::new(0xff0000, 0));
    assert_eq!(world.get([9, 16, 0]), PackedVoxel::new(0x0000ff, 0));
    assert_eq!(world.get([1, 2, 0]), PackedVoxel::EMPTY);

    let parameters = world.transform().parameters();
    assert_eq!(parameters.position, FreeVector::zero());
    assert_eq!(parameters.scale, vec3(16.0, 24.0, 8.0) / 128.0_f32);
}

#[test]
fn materials_are_converted_and_deduplicated() {
    let mut file = data(vec![small_model()]);
    let shiny = dict(&[("_type", "_metal"), ("_metal", "1"), ("_ior", "0.5")]);
    file.materials = vec![
        dot_vox::Material {
            id: 2,
            properties: shiny.clone(),
        },
        dot_vox::Material {
            id: 3,
            properties: shiny,
        },
    ];
    let mut scene = Scene::new();
    let summary = import_dot_vox_data(&mut scene, &file).unwrap();
    assert_eq!(summary.new_materials, 1);
    assert_eq!(scene.materials().len(), 2);

    let material = scene.materials().get(1).unwrap();
    assert_eq!(
        (
            material.roughness,
            material.metallic,
            material.transparency,
            material.ior
        ),
        (1.0, 1.0, 0.0, 1.5)
    );
    // Palette index 1 is color index 2 in the file.
    let world = scene.world(0).unwrap();
    assert_eq!(world.get([9, 16, 0]).material_index(), 1);
    assert_eq!(world.get([1, 0, 2]).material_index(), 0);
}

#[test]
fn scene_graph_translation_places_model() {
    let mut file = data(vec![small_model()]);
    let frame = |t: &str| dot_vox::Frame {
        attributes: dict(&[("_t", t)]),
    };
    file.scenes = vec![
        dot_vox::SceneNode::Transform {
            attributes: dot_vox::Dict::new(),
            frames: vec![frame("0 0 0")],
            child: 1,
            layer_id: 0,
        },
        dot_vox::SceneNode::Group {
            attributes: dot_vox::Dict::new(),
            children: vec![2],
        },
        dot_vox::SceneNode::Transform {
            attributes: dict(&[("_name", "thing")]),
            frames: vec![frame("64 32 16")],
            child: 3,
            layer_id: 0,
        },
        dot_vox::SceneNode::Shape {
            attributes: dot_vox::Dict::new(),
            models: vec![dot_vox::ShapeModel {
                model_id: 0,
                attributes: dot_vox::Dict::new(),
            }],
        },
    ];
    let mut scene = Scene::new();
    import_dot_vox_data(&mut scene, &file).unwrap();
    assert_eq!(
        scene.world(0).unwrap().transform().parameters().position,
        vec3(0.5, 0.125, 0.25)
    );
}

#[test]
fn scene_graph_cycle_is_an_error() {
    let mut file = data(vec![small_model()]);
    file.scenes = vec![dot_vox::SceneNode::Group {
        attributes: dot_vox::Dict::new(),
        children: vec![0],
    }];
    let mut scene = Scene::new();
    assert!(matches!(
        import_dot_vox_data(&mut scene, &file),
        Err(ImportError::SceneGraphRecursion)
    ));
}

#[test]
fn errors_leave_scene_unchanged() {
    let mut scene = Scene::new();

    assert!(matches!(
        import_dot_vox_data(&mut scene, &data(vec![])),
        Err(ImportError::FileEmpty)
    ));

    // A valid material followed by a reference to a model that does not exist.
    let mut file = data(vec![small_model()]);
    file.materials = vec![dot_vox::Material {
        id: 1,
        properties: dict(&[("_trans", "0.5")]),
    }];
    file.scenes = vec![dot_vox::SceneNode::Shape {
        attributes: dot_vox::Dict::new(),
        models: vec![dot_vox::ShapeModel {
            model_id: 7,
            attributes: dot_vox::Dict::new(),
        }],
    }];
    assert!(matches!(
        import_dot_vox_data(&mut scene, &file),
        Err(ImportError::MissingModel(7))
    ));

    assert_eq!(scene.world_slots(), 0);
    assert_eq!(scene.materials().len(), 1);
}

#[test]
fn short_palette() {
    let mut file = data(vec![small_model()]);
    file.palette.truncate(1);
    let mut scene = Scene::new();
    assert!(matches!(
        import_dot_vox_data(&mut scene, &file),
        Err(ImportError::PaletteTooShort { len: 1, index: 1 })
    ));
}

#[test]
fn oversized_model() {
    let model = dot_vox::Model {
        size: dot_vox::Size {
            x: 1,
            y: 1000,
            z: 1,
        },
        voxels: Vec::new(),
    };
    let mut scene = Scene::new();
    assert!(matches!(
        import_dot_vox_data(&mut scene, &data(vec![model])),
        Err(ImportError::ModelTooLarge { model: 0, .. })
    ));
}

#[test]
fn invalid_bytes() {
    let mut scene = Scene::new();
    assert!(matches!(
        import_vox(&mut scene, b"not a vox file"),
        Err(ImportError::Parse(_))
    ));
}

#[test]
fn import_from_bytes() {
    let mut bytes = Vec::new();
    data(vec![small_model()]).write_vox(&mut bytes).unwrap();
    let mut scene = Scene::new();
    let summary = import_vox(&mut scene, &bytes).unwrap();
    assert_eq!(summary.voxel_count, 2);
    assert_eq!(
        scene.world(0).unwrap().get([1, 0, 2]),
        PackedVoxel::new(0xff0000, 0)
    );
}

#[test]
fn translation_parsing() {
    assert_eq!(parse_translation("1 -2 3"), Some(vec3(1.0, -2.0, 3.0)));
    assert_eq!(parse_translation("1 2"), None);
    assert_eq!(parse_translation("1 2 3 4"), None);
    assert_eq!(parse_translation("a b c"), None);
}

#[test]
fn stamp_into_existing_world() {
    let mut scene = Scene::new();
    scene.add_world(VoxelWorld::new([2, 3, 2]).unwrap());
    let stamped =
        stamp_dot_vox_data(&mut scene, 0, &data(vec![small_model()]), vec3(4, 0, 6)).unwrap();
    assert_eq!(stamped, 2);
    assert_eq!(scene.world_slots(), 1);

    let world = scene.world(0).unwrap();
    assert_eq!(world.get([5, 0, 8]), PackedVoxel::new(0xff0000, 0));
    assert_eq!(world.get([13, 16, 6]), PackedVoxel::new(0x0000ff, 0));
    assert_eq!(world.get([1, 0, 2]), PackedVoxel::EMPTY);
}

#[test]
fn stamp_drops_voxels_outside_world() {
    let mut scene = Scene::new();
    scene.add_world(VoxelWorld::new([1, 1, 1]).unwrap());
    let stamped =
        stamp_dot_vox_data(&mut scene, 0, &data(vec![small_model()]), vec3(0, 0, 0)).unwrap();
    // The second voxel is at y = 16, past the 8-voxel world.
    assert_eq!(stamped, 1);
    let world = scene.world(0).unwrap();
    assert_eq!(world.get([1, 0, 2]), PackedVoxel::new(0xff0000, 0));
}

#[test]
fn stamp_follows_scene_graph_translation() {
    let mut file = data(vec![small_model()]);
    file.scenes = vec![
        dot_vox::SceneNode::Transform {
            attributes: dot_vox::Dict::new(),
            frames: vec![dot_vox::Frame {
                attributes: dict(&[("_t", "3 0 1")]),
            }],
            child: 1,
            layer_id: 0,
        },
        dot_vox::SceneNode::Shape {
            attributes: dot_vox::Dict::new(),
            models: vec![dot_vox::ShapeModel {
                model_id: 0,
                attributes: dot_vox::Dict::new(),
            }],
        },
    ];
    let mut scene = Scene::new();
    scene.add_world(VoxelWorld::new([4, 4, 4]).unwrap());
    stamp_dot_vox_data(&mut scene, 0, &file, vec3(1, 1, 1)).unwrap();
    // File voxel (1, 2, 0) becomes (1, 0, 2), then moves by (3, 1, 0) and (1, 1, 1).
    assert_eq!(
        scene.world(0).unwrap().get([5, 2, 3]),
        PackedVoxel::new(0xff0000, 0)
    );
}

#[test]
fn stamp_errors_leave_scene_unchanged() {
    let mut scene = Scene::new();
    assert!(matches!(
        stamp_dot_vox_data(&mut scene, 0, &data(vec![small_model()]), vec3(0, 0, 0)),
        Err(ImportError::MissingWorld(0))
    ));
    assert_eq!(scene.world_slots(), 0);

    scene.add_world(VoxelWorld::new([2, 2, 2]).unwrap());
    let mut file = data(vec![small_model()]);
    file.materials = vec![dot_vox::Material {
        id: 1,
        properties: dict(&[("_metal", "1")]),
    }];
    file.palette.truncate(1);
    assert!(matches!(
        stamp_dot_vox_data(&mut scene, 0, &file, vec3(0, 0, 0)),
        Err(ImportError::PaletteTooShort { len: 1, index: 1 })
    ));
    assert_eq!(scene.materials().len(), 1);
    assert_eq!(scene.world(0).unwrap().brick_count(), 0);
}
