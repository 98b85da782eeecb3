//! Generalized Conway cellular automata living in the voxels of a [`VoxelWorld`].
//!
//! Each cell has a state from 0 (dead) to the rule's `start_state`. Only cells in state
//! `start_state - 1` count as live neighbours; older cells decay by one state per tick,
//! leaving a fading trail of color behind.

use core::fmt;

use rand::Rng;
use rayon::prelude::*;

use crate::math::{
    BRICK_SIZE, GridAab, GridCoordinate, GridPoint, GridSize, GridVector, PackedVoxel, Rgb,
    WORLD_SIZE,
};
use crate::world::VoxelWorld;

/// Which cells count as a cell's neighbours.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum::EnumIter, strum::IntoStaticStr)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_enums)]
pub enum Neighbourhood {
    /// The 26 cells sharing a face, edge, or corner.
    #[default]
    Moore,
    /// The 6 cells sharing a face.
    VonNeumann,
}

impl Neighbourhood {
    /// Offsets from a cell to its neighbours.
    pub fn offsets(self) -> &'static [GridVector] {
        match self {
            Neighbourhood::Moore => &MOORE,
            Neighbourhood::VonNeumann => &VON_NEUMANN,
        }
    }
}

const VON_NEUMANN: [GridVector; 6] = [
    GridVector::new(1, 0, 0),
    GridVector::new(-1, 0, 0),
    GridVector::new(0, 1, 0),
    GridVector::new(0, -1, 0),
    GridVector::new(0, 0, 1),
    GridVector::new(0, 0, -1),
];

const MOORE: [GridVector; 26] = {
    let mut offsets = [GridVector::new(0, 0, 0); 26];
    let mut i = 0;
    let mut n = 0;
    while n < 27 {
        let offset = GridVector::new(n % 3 - 1, n / 3 % 3 - 1, n / 9 - 1);
        if n != 13 {
            offsets[i] = offset;
            i += 1;
        }
        n += 1;
    }
    offsets
};

/// Transition rule of a [`CellularAutomata`].
///
/// `survival` and `spawn` are indexed by the number of live neighbours.
#[derive(Clone, Eq, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[allow(clippy::exhaustive_structs)]
pub struct Rule {
    /// A live cell keeps its state if its neighbour count is set here.
    pub survival: [bool; 27],
    /// A dead cell comes alive if its neighbour count is set here.
    pub spawn: [bool; 27],
    /// State given to newly seeded cells. Cells are live in state `start_state - 1`.
    pub start_state: u8,
    #[allow(missing_docs)]
    pub neighbourhood: Neighbourhood,
}

impl Rule {
    /// Constructs a rule from lists of neighbour counts.
    pub fn from_counts(
        survival: &[usize],
        spawn: &[usize],
        start_state: u8,
        neighbourhood: Neighbourhood,
    ) -> Self {
        let table = |counts: &[usize]| {
            let mut table = [false; 27];
            for &count in counts {
                if let Some(entry) = table.get_mut(count) {
                    *entry = true;
                }
            }
            table
        };
        Self {
            survival: table(survival),
            spawn: table(spawn),
            start_state,
            neighbourhood,
        }
    }

    /// State of a cell which counts as a live neighbour.
    #[inline]
    pub fn live_state(&self) -> u8 {
        self.start_state.saturating_sub(1)
    }

    /// Returns the next state of a cell currently in `state` with `count` live neighbours.
    pub fn next_state(&self, state: u8, count: usize) -> u8 {
        let live = self.live_state();
        if state == 0 {
            if self.spawn.get(count).copied().unwrap_or(false) {
                live
            } else {
                0
            }
        } else if state == live && self.survival.get(count).copied().unwrap_or(false) {
            state
        } else {
            state - 1
        }
    }

    /// Voxel drawn for a cell in `state`: red when freshly alive, fading toward yellow.
    pub fn voxel_for_state(&self, state: u8) -> PackedVoxel {
        if state == 0 {
            return PackedVoxel::EMPTY;
        }
        let t = f32::from(state) / f32::from(self.start_state.max(1));
        let color = Rgb::new(1.0, 0.0, 0.0).lerp(Rgb::new(1.0, 1.0, 0.0), t);
        PackedVoxel::new(color.to_packed(), 0)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |table: &[bool; 27]| -> Vec<usize> {
            table
                .iter()
                .enumerate()
                .filter_map(|(count, &set)| set.then_some(count))
                .collect()
        };
        f.debug_struct("Rule")
            .field("survival", &counts(&self.survival))
            .field("spawn", &counts(&self.spawn))
            .field("start_state", &self.start_state)
            .field("neighbourhood", &self.neighbourhood)
            .finish()
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::from_counts(&[4, 5], &[3], 6, Neighbourhood::Moore)
    }
}

/// User-adjustable parameters of the automata mode, as stored in
/// [`Settings`](crate::settings::Settings).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[allow(clippy::exhaustive_structs)]
pub struct AutomataSettings {
    #[allow(missing_docs)]
    pub rule: Rule,
    /// Probability that each cell of the seed cube starts alive.
    pub probability: f32,
    /// Ticks per second of animation.
    pub fps: f32,
    /// Half the side length of the seed cube, in voxels.
    pub radius: GridCoordinate,
}

impl Default for AutomataSettings {
    fn default() -> Self {
        Self {
            rule: Rule::default(),
            probability: 0.5,
            fps: 20.0,
            radius: 15,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Double-buffered cell states for every voxel of one world.
#[derive(Clone, Debug)]
pub struct CellularAutomata {
    bounds: GridAab,
    current: Vec<u8>,
    next: Vec<u8>,
}

impl CellularAutomata {
    /// Constructs an all-dead grid covering a world of the given voxel resolution.
    pub fn new(resolution: impl Into<GridSize>) -> Self {
        let bounds = GridAab::from_lower_size([0, 0, 0], resolution);
        Self {
            bounds,
            current: vec![0; bounds.volume()],
            next: vec![0; bounds.volume()],
        }
    }

    /// The cells, which coincide with voxels of the world.
    pub fn bounds(&self) -> GridAab {
        self.bounds
    }

    /// Current states, in [`GridAab::linear_index()`] order.
    pub fn states(&self) -> &[u8] {
        &self.current
    }

    /// Current state of one cell; 0 outside the grid.
    pub fn state(&self, cube: impl Into<GridPoint>) -> u8 {
        self.bounds
            .linear_index(cube.into())
            .map_or(0, |index| self.current[index])
    }

    /// Sets the state of one cell and draws it into `world`.
    pub fn set_state(
        &mut self,
        world: &mut VoxelWorld,
        rule: &Rule,
        cube: impl Into<GridPoint>,
        state: u8,
    ) {
        let cube = cube.into();
        if let Some(index) = self.bounds.linear_index(cube) {
            self.current[index] = state;
            world.set(cube, rule.voxel_for_state(state));
        }
    }

    /// Replaces `world` with a fresh default-sized grid and seeds a centered cube of
    /// side `2·radius` with cells in the start state, each with probability
    /// `probability`. Seeded cells are drawn red.
    pub fn randomize(
        &mut self,
        world: &mut VoxelWorld,
        settings: &AutomataSettings,
        rng: &mut impl Rng,
    ) {
        let size = WORLD_SIZE / BRICK_SIZE;
        if let Err(error) = world.resize([size, size, size]) {
            log::error!("{error}");
            return;
        }
        world.clear(PackedVoxel::EMPTY);
        *self = Self::new(world.resolution());

        let rule = &settings.rule;
        let center = WORLD_SIZE / 2;
        let radius = settings.radius.clamp(0, center);
        let seed_region = GridAab::checked_from_lower_size([center - radius; 3], [radius * 2; 3])
            .ok()
            .and_then(|region| region.intersection(self.bounds));
        let mut seeded = 0usize;
        for cube in seed_region.into_iter().flat_map(GridAab::interior_iter) {
            if rng.random::<f32>() < settings.probability {
                if let Some(index) = self.bounds.linear_index(cube) {
                    self.current[index] = rule.start_state;
                    world.set(cube, PackedVoxel::new(0xff0000, 0));
                    seeded += 1;
                }
            }
        }
        log::info!("seeded cellular automata with {seeded} live cells");
    }

    /// Kills every cell and empties `world`.
    pub fn clear(&mut self, world: &mut VoxelWorld) {
        self.current.fill(0);
        self.next.fill(0);
        world.clear(PackedVoxel::EMPTY);
    }

    /// Advances every cell by one generation and draws the result into `world`.
    ///
    /// Neighbourhoods wrap around the edges of the grid.
    pub fn tick(&mut self, world: &mut VoxelWorld, rule: &Rule) {
        if world.bounds() != self.bounds {
            log::debug!("world was resized; restarting cellular automata");
            *self = Self::new(world.resolution());
        }
        world.allocate_all();

        let Self {
            bounds,
            current,
            next,
        } = self;
        let bounds = *bounds;
        let size = bounds.size();
        let slice_len = (size.width * size.height) as usize;
        if slice_len == 0 {
            return;
        }
        let current: &[u8] = current;
        let world: &VoxelWorld = world;
        let offsets = rule.neighbourhood.offsets();
        let live = rule.live_state();

        next.par_chunks_mut(slice_len)
            .enumerate()
            .for_each(|(z, slice)| {
                let z = z as GridCoordinate;
                for y in 0..size.height {
                    for x in 0..size.width {
                        let cube = GridPoint::new(x, y, z);
                        let count = offsets
                            .iter()
                            .filter(|&&offset| {
                                let n = cube + offset;
                                let wrapped = GridPoint::new(
                                    n.x.rem_euclid(size.width),
                                    n.y.rem_euclid(size.height),
                                    n.z.rem_euclid(size.depth),
                                );
                                bounds
                                    .linear_index(wrapped)
                                    .is_some_and(|i| current[i] == live)
                            })
                            .count();
                        let index_in_slice = (x + y * size.width) as usize;
                        let state = current[index_in_slice + z as usize * slice_len];
                        let new_state = rule.next_state(state, count);
                        slice[index_in_slice] = new_state;
                        if new_state != state {
                            world.set_in_allocated(cube, rule.voxel_for_state(new_state));
                        }
                    }
                }
            });

        core::mem::swap(&mut self.current, &mut self.next);
    }
}
