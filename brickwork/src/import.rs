//! Importing MagicaVoxel `.vox` files into a [`Scene`].
//!
//! Each model in the file becomes one [`VoxelWorld`], sized in whole bricks and placed
//! according to the translation the file's scene graph gives it. MagicaVoxel is Z-up,
//! so the file's Y and Z axes are swapped on the way in.

use std::collections::HashMap;

use crate::material::{Material, MaterialTable, MaterialTableFullError};
use crate::math::{
    BRICK_SIZE, FreeVector, GridCoordinate, GridPoint, GridSize, GridVector, PackedVoxel,
    TransformError, TransformParameters, WORLD_SIZE,
};
use crate::scene::Scene;
use crate::world::{VoxelWorld, WorldSizeError};

#[cfg(test)]
mod tests;

/// Largest model edge, in voxels, that MagicaVoxel produces.
const MAX_MODEL_SIZE: u32 = 256;

/// Scene graph depth beyond which the graph is assumed to be cyclic.
const MAX_SCENE_DEPTH: u32 = 100;

/// Material keys which are read.
const MATERIAL_KEYS: [&str; 4] = ["_rough", "_metal", "_trans", "_ior"];
/// Material keys which MagicaVoxel writes but which have no counterpart in [`Material`].
const IGNORED_MATERIAL_KEYS: [&str; 14] = [
    "_type", "_weight", "_spec", "_ri", "_att", "_flux", "_ldr", "_emit", "_plastic", "_alpha",
    "_d", "_g", "_media", "_media_type",
];

/// Description of what [`import_vox()`] added to the scene.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ImportSummary {
    /// Indices of the new worlds, one per model in the file.
    pub world_indices: Vec<usize>,
    /// Number of non-empty voxels stored.
    pub voxel_count: usize,
    /// Number of materials that were not already in the scene's table.
    pub new_materials: usize,
}

/// Errors that may occur while importing `.vox` data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImportError {
    /// The data could not be parsed as a `.vox` file.
    #[error("{0}")]
    Parse(&'static str),

    #[allow(missing_docs)]
    #[error("file contains no models to import")]
    FileEmpty,

    #[allow(missing_docs)]
    #[error("file refers to model with ID {0} but does not define it")]
    MissingModel(u32),

    #[allow(missing_docs)]
    #[error("file refers to scene node with ID {0} but does not define it")]
    MissingSceneNode(u32),

    #[allow(missing_docs)]
    #[error("scene graph is cyclic or too deep")]
    SceneGraphRecursion,

    #[allow(missing_docs)]
    #[error("attribute “{attribute}” of scene node with ID {node} is invalid")]
    SceneAttributeParse { node: u32, attribute: &'static str },

    #[allow(missing_docs)]
    #[error("palette of {len} colors too short to contain index {index}")]
    PaletteTooShort { len: usize, index: u8 },

    #[allow(missing_docs)]
    #[error("model {model} is too large: {}×{}×{}", size.x, size.y, size.z)]
    ModelTooLarge { model: usize, size: dot_vox::Size },

    #[allow(missing_docs)]
    #[error("there is no world with index {0} to draw into")]
    MissingWorld(usize),

    #[allow(missing_docs)]
    #[error("failed to create world for model")]
    World(#[from] WorldSizeError),

    #[allow(missing_docs)]
    #[error("failed to place world for model")]
    Placement(#[source] TransformError),

    #[allow(missing_docs)]
    #[error("too many distinct materials")]
    MaterialTableFull(#[from] MaterialTableFullError),
}

/// Parses `.vox` data and adds its models to `scene` as new worlds.
///
/// Materials are merged into the scene's [`MaterialTable`]. If an error occurs, the
/// scene is left unchanged.
pub fn import_vox(scene: &mut Scene, bytes: &[u8]) -> Result<ImportSummary, ImportError> {
    let data = dot_vox::load_bytes(bytes).map_err(ImportError::Parse)?;
    import_dot_vox_data(scene, &data).inspect_err(|error| {
        log::error!("failed to import .vox data: {error}");
    })
}

/// Adds already-parsed `.vox` data to `scene`. See [`import_vox()`].
pub fn import_dot_vox_data(
    scene: &mut Scene,
    data: &dot_vox::DotVoxData,
) -> Result<ImportSummary, ImportError> {
    let dot_vox::DotVoxData {
        version,
        models,
        palette,
        materials,
        scenes,
        layers,
    } = data;
    if models.is_empty() {
        return Err(ImportError::FileEmpty);
    }

    let mut table = scene.materials().clone();
    let old_material_count = table.len();
    let material_indices = convert_materials(materials, &mut table)?;

    let mut offsets: HashMap<u32, FreeVector> = HashMap::new();
    if !scenes.is_empty() {
        walk_scene_graph(data, 0, FreeVector::zero(), 0, &mut offsets)?;
    }

    let mut worlds = Vec::with_capacity(models.len());
    let mut voxel_count = 0;
    for (model_index, model) in models.iter().enumerate() {
        let offset = u32::try_from(model_index)
            .ok()
            .and_then(|id| offsets.get(&id))
            .copied()
            .unwrap_or_default();
        let (world, count) = convert_model(model_index, model, palette, &material_indices, offset)?;
        worlds.push(world);
        voxel_count += count;
    }

    // Nothing can fail past this point.
    let new_materials = table.len() - old_material_count;
    *scene.materials_mut() = table;
    let world_indices = worlds
        .into_iter()
        .map(|world| scene.add_world(world))
        .collect();

    log::info!(
        "imported MagicaVoxel .vox version {version}: {} models, {voxel_count} voxels, \
        {new_materials} new materials ({} in file), {} scene nodes, {} ignored layers",
        models.len(),
        materials.len(),
        scenes.len(),
        layers.len(),
    );
    Ok(ImportSummary {
        world_indices,
        voxel_count,
        new_materials,
    })
}

/// Parses `.vox` data and draws its models into the existing world `world_index`, with
/// the file's origin at voxel `position` of that world.
///
/// Each model is offset by its scene graph translation, like [`import_vox()`] does.
/// Voxels which land outside the world are dropped. Returns the number of voxels stored.
/// If an error occurs, the scene is left unchanged.
pub fn stamp_vox(
    scene: &mut Scene,
    world_index: usize,
    bytes: &[u8],
    position: GridVector,
) -> Result<usize, ImportError> {
    let data = dot_vox::load_bytes(bytes).map_err(ImportError::Parse)?;
    stamp_dot_vox_data(scene, world_index, &data, position).inspect_err(|error| {
        log::error!("failed to draw .vox data: {error}");
    })
}

/// Draws already-parsed `.vox` data into an existing world. See [`stamp_vox()`].
pub fn stamp_dot_vox_data(
    scene: &mut Scene,
    world_index: usize,
    data: &dot_vox::DotVoxData,
    position: GridVector,
) -> Result<usize, ImportError> {
    if data.models.is_empty() {
        return Err(ImportError::FileEmpty);
    }
    let bounds = scene
        .world(world_index)
        .ok_or(ImportError::MissingWorld(world_index))?
        .bounds();

    let mut table = scene.materials().clone();
    let material_indices = convert_materials(&data.materials, &mut table)?;

    let mut offsets: HashMap<u32, FreeVector> = HashMap::new();
    if !data.scenes.is_empty() {
        walk_scene_graph(data, 0, FreeVector::zero(), 0, &mut offsets)?;
    }

    let mut stamped = Vec::new();
    for (model_index, model) in data.models.iter().enumerate() {
        let translation = u32::try_from(model_index)
            .ok()
            .and_then(|id| offsets.get(&id))
            .map_or(GridVector::zero(), |t| {
                GridVector::new(t.x as i32, t.z as i32, t.y as i32)
            });
        let offset = position + translation;
        stamped.extend(
            model_voxels(model_index, model, &data.palette, &material_indices)?
                .into_iter()
                .map(|(cube, voxel)| (cube + offset, voxel))
                .filter(|&(cube, _)| bounds.contains_cube(cube)),
        );
    }

    // Nothing can fail past this point.
    *scene.materials_mut() = table;
    if let Some(world) = scene.world_mut(world_index) {
        for &(cube, voxel) in &stamped {
            world.set(cube, voxel);
        }
    }
    log::info!(
        "drew {} models with {} voxels into world {world_index}",
        data.models.len(),
        stamped.len()
    );
    Ok(stamped.len())
}

// -------------------------------------------------------------------------------------------------

/// Converts the file's materials, returning the table index to use for each palette
/// index (as stored in [`dot_vox::Voxel::i`]).
fn convert_materials(
    materials: &[dot_vox::Material],
    table: &mut MaterialTable,
) -> Result<[u8; 256], ImportError> {
    let mut indices = [0u8; 256];
    for material in materials {
        warn_extra_attributes(
            format_args!("material #{}", material.id),
            &material.properties,
            &[&MATERIAL_KEYS[..], &IGNORED_MATERIAL_KEYS[..]].concat(),
        );
        // Material IDs count from 1, like the color indices in the file.
        let Some(palette_index) = material
            .id
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < indices.len())
        else {
            continue;
        };
        let property = |key: &str, default: f32| -> f32 {
            match material.properties.get(key).map(|s| s.parse::<f32>()) {
                Some(Ok(value)) if value.is_finite() => value,
                Some(_) => {
                    log::warn!("material #{} has invalid {key}", material.id);
                    default
                }
                None => default,
            }
        };
        let converted = Material {
            roughness: property("_rough", 1.0).clamp(0.0, 1.0),
            metallic: property("_metal", 0.0).clamp(0.0, 1.0),
            transparency: property("_trans", 0.0).clamp(0.0, 1.0),
            // Stored as the difference from 1.
            ior: 1.0 + property("_ior", 0.0).max(0.0),
            ..Material::DEFAULT
        };
        indices[palette_index] = table.find_or_insert(converted)?;
    }
    Ok(indices)
}

/// Converts one model to a world, returning it and the number of voxels stored.
fn convert_model(
    model_index: usize,
    model: &dot_vox::Model,
    palette: &[dot_vox::Color],
    material_indices: &[u8; 256],
    offset: FreeVector,
) -> Result<(VoxelWorld, usize), ImportError> {
    let size = model.size;
    if size.x > MAX_MODEL_SIZE || size.y > MAX_MODEL_SIZE || size.z > MAX_MODEL_SIZE {
        return Err(ImportError::ModelTooLarge {
            model: model_index,
            size,
        });
    }
    let bricks = |voxels: u32| (voxels as GridCoordinate + BRICK_SIZE - 1) / BRICK_SIZE;
    let grid_size = GridSize::new(bricks(size.x), bricks(size.z), bricks(size.y));
    let mut world = VoxelWorld::new(grid_size)?;

    let world_size = WORLD_SIZE as f32;
    world
        .set_transform_parameters(TransformParameters {
            position: FreeVector::new(offset.x, offset.z, offset.y) / world_size,
            rotation: FreeVector::zero(),
            scale: grid_size.to_vector().to_f32() * (BRICK_SIZE as f32 / world_size),
        })
        .map_err(ImportError::Placement)?;

    let voxels = model_voxels(model_index, model, palette, material_indices)?;
    for &(cube, voxel) in &voxels {
        world.set(cube, voxel);
    }
    Ok((world, voxels.len()))
}

/// Converts the voxels of one model to world coordinates relative to the model's origin,
/// skipping those with no color.
fn model_voxels(
    model_index: usize,
    model: &dot_vox::Model,
    palette: &[dot_vox::Color],
    material_indices: &[u8; 256],
) -> Result<Vec<(GridPoint, PackedVoxel)>, ImportError> {
    let size = model.size;
    let mut voxels = Vec::with_capacity(model.voxels.len());
    let mut outside = 0;
    for &dot_vox::Voxel { x, y, z, i } in &model.voxels {
        if u32::from(x) >= size.x || u32::from(y) >= size.y || u32::from(z) >= size.z {
            outside += 1;
            continue;
        }
        let &dot_vox::Color { r, g, b, a: _ } =
            palette
                .get(usize::from(i))
                .ok_or(ImportError::PaletteTooShort {
                    len: palette.len(),
                    index: i,
                })?;
        let rgb = u32::from_be_bytes([0, r, g, b]);
        if rgb == 0 {
            continue;
        }
        let voxel = PackedVoxel::new(rgb, material_indices[usize::from(i)]);
        voxels.push((GridPoint::new(i32::from(x), i32::from(z), i32::from(y)), voxel));
    }
    if outside > 0 {
        log::warn!("model {model_index} has {outside} voxels outside its declared size");
    }
    Ok(voxels)
}

/// Walks the scene graph from `node`, recording in `offsets` the accumulated translation
/// of the first placement of each model.
fn walk_scene_graph(
    data: &dot_vox::DotVoxData,
    node: u32,
    parent_offset: FreeVector,
    depth: u32,
    offsets: &mut HashMap<u32, FreeVector>,
) -> Result<(), ImportError> {
    if depth > MAX_SCENE_DEPTH {
        return Err(ImportError::SceneGraphRecursion);
    }
    let scene_node = usize::try_from(node)
        .ok()
        .and_then(|index| data.scenes.get(index))
        .ok_or(ImportError::MissingSceneNode(node))?;
    match scene_node {
        dot_vox::SceneNode::Transform {
            attributes,
            frames,
            child,
            layer_id: _,
        } => {
            warn_extra_attributes(
                format_args!("transform node #{node}"),
                attributes,
                &["_name", "_hidden"],
            );
            let translation = match frames.first().and_then(|f| f.attributes.get("_t")) {
                Some(t) => parse_translation(t).ok_or(ImportError::SceneAttributeParse {
                    node,
                    attribute: "_t",
                })?,
                None => FreeVector::zero(),
            };
            walk_scene_graph(data, *child, parent_offset + translation, depth + 1, offsets)?;
        }
        dot_vox::SceneNode::Group {
            attributes: _,
            children,
        } => {
            for &child in children {
                walk_scene_graph(data, child, parent_offset, depth + 1, offsets)?;
            }
        }
        dot_vox::SceneNode::Shape {
            attributes: _,
            models,
        } => {
            for shape_model in models {
                let id = shape_model.model_id;
                if usize::try_from(id).map_or(true, |i| i >= data.models.len()) {
                    return Err(ImportError::MissingModel(id));
                }
                offsets.entry(id).or_insert(parent_offset);
            }
        }
    }
    Ok(())
}

fn parse_translation(text: &str) -> Option<FreeVector> {
    let mut components = text.split(' ').map(|s| s.parse::<i32>().ok());
    let vector = FreeVector::new(
        components.next()?? as f32,
        components.next()?? as f32,
        components.next()?? as f32,
    );
    components.next().is_none().then_some(vector)
}

fn warn_extra_attributes(
    thing: core::fmt::Arguments<'_>,
    attributes: &dot_vox::Dict,
    expected_attributes: &[&str],
) {
    let unexpected = Vec::from_iter(
        attributes
            .keys()
            .filter(|key| !expected_attributes.contains(&key.as_str())),
    );
    if !unexpected.is_empty() {
        log::warn!("{thing} contains unknown attributes {unexpected:?}");
    }
}
