use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

use brickwork::automata::{AutomataSettings, CellularAutomata};
use brickwork::math::{FreePoint, FreeVector};
use brickwork::scene::Scene;
use brickwork::world::{NoiseParameters, VoxelWorld};

/// Source of the scene to create/load.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum SceneSource {
    /// A scene with no worlds, showing only the environment.
    Empty,
    /// Worlds filled with Perlin noise. The first is placed at the origin and the rest are
    /// placed at random.
    Noise {
        #[allow(missing_docs)]
        seed: Option<u64>,
        #[allow(missing_docs)]
        worlds: usize,
    },
    /// One world animated by cellular automata, as configured by
    /// [`Settings::automata`](brickwork::settings::Settings::automata).
    Automata {
        #[allow(missing_docs)]
        seed: Option<u64>,
    },
    /// Import the given MagicaVoxel `.vox` file.
    File(PathBuf),
}

impl SceneSource {
    /// Perform and log the creation of the scene.
    ///
    /// A file that cannot be read is an error, but a file that cannot be imported is only
    /// logged, and produces an empty scene.
    pub fn create_scene(self, automata: &AutomataSettings) -> Result<LiveScene, anyhow::Error> {
        let start_time = Instant::now();
        let mut live = LiveScene::new(Scene::new());
        match &self {
            SceneSource::Empty => {}
            &SceneSource::Noise { seed, worlds } => {
                let mut rng = Xoshiro256Plus::seed_from_u64(choose_seed(seed));
                for index in 0..worlds {
                    let mut world = VoxelWorld::default();
                    if index > 0 {
                        world.randomize_transform(&mut rng);
                    }
                    world.generate_noise(&NoiseParameters {
                        seed: rng.random(),
                        ..NoiseParameters::default()
                    });
                    live.scene.add_world(world);
                }
            }
            &SceneSource::Automata { seed } => {
                let mut rng = Xoshiro256Plus::seed_from_u64(choose_seed(seed));
                let mut world = VoxelWorld::default();
                let mut cells = CellularAutomata::new(world.resolution());
                cells.randomize(&mut world, automata, &mut rng);
                let world_index = live.scene.add_world(world);
                live.automaton = Some(Automaton {
                    world_index,
                    cells,
                    pending_time: 0.0,
                });
            }
            SceneSource::File(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("could not read scene file {path:?}"))?;
                match live.scene.import_vox(&bytes) {
                    Ok(summary) => log::info!(
                        "Imported {worlds} worlds and {voxels} voxels from {path:?}",
                        worlds = summary.world_indices.len(),
                        voxels = summary.voxel_count,
                    ),
                    Err(e) => log::error!("Could not import {path:?}: {e}"),
                }
            }
        }
        log::debug!(
            "Created scene from {self:?} ({:.3} s)",
            start_time.elapsed().as_secs_f32()
        );
        Ok(live)
    }
}

fn choose_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let seed = rand::rng().random();
        log::info!("Randomly chosen scene seed: {seed}");
        seed
    })
}

// -------------------------------------------------------------------------------------------------

/// A [`Scene`] together with whatever animates it between frames.
#[derive(Debug)]
pub struct LiveScene {
    scene: Scene,
    automaton: Option<Automaton>,
}

#[derive(Debug)]
struct Automaton {
    world_index: usize,
    cells: CellularAutomata,
    /// Seconds of animation not yet accounted for by ticks.
    pending_time: f32,
}

impl LiveScene {
    /// Wraps a scene which is not animated.
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            automaton: None,
        }
    }

    #[allow(missing_docs)]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The average of the corners of every active world, or the origin if there are none.
    pub fn center(&self) -> FreePoint {
        let mut sum = FreeVector::zero();
        let mut count = 0u32;
        for (_, world) in self.scene.worlds().filter(|(_, world)| world.is_active()) {
            for corner in world.corners() {
                sum += corner.to_vector();
                count += 1;
            }
        }
        if count == 0 {
            FreePoint::origin()
        } else {
            (sum / count as f32).to_point()
        }
    }

    /// Advances animation by `dt` seconds, returning the number of automata generations
    /// that were computed.
    pub fn step(&mut self, dt: f32, settings: &AutomataSettings) -> usize {
        let Some(automaton) = &mut self.automaton else {
            return 0;
        };
        if settings.fps <= 0.0 {
            return 0;
        }
        let Some(world) = self.scene.world_mut(automaton.world_index) else {
            log::warn!("automata world was removed; animation stopped");
            self.automaton = None;
            return 0;
        };

        let period = settings.fps.recip();
        automaton.pending_time += dt;
        let mut ticks = 0;
        while automaton.pending_time >= period {
            automaton.cells.tick(world, &settings.rule);
            automaton.pending_time -= period;
            ticks += 1;
        }
        ticks
    }
}
