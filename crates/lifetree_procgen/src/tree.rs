use std::f32::consts::TAU;

use glam::Vec3;

use crate::params::TreeParams;
use crate::seed::{RandomSource, TreeSeed};

/// Per-level length decay of child branches
pub const LENGTH_DECAY: f32 = 0.7;
/// Per-level radius decay of child branches
pub const RADIUS_DECAY: f32 = 0.6;
/// Tip radius as a fraction of the base radius
pub const BRANCH_TAPER: f32 = 0.7;
/// Children shorter than this are not spawned
pub const MIN_BRANCH_LENGTH: f32 = 0.1;
/// A child never outgrows this fraction of its parent, whatever the jitter
pub const MAX_CHILD_LENGTH_RATIO: f32 = 0.95;
/// Hard cap on branch count, bounds regeneration time at high density
pub const MAX_BRANCHES: usize = 6000;

const ELEVATION_JITTER_DEG: f32 = 20.0;
const AZIMUTH_JITTER: f32 = 0.3;
const MAX_TILT_DEG: f32 = 89.0;

/// One branch segment in the skeleton arena
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: usize,
    pub start: Vec3,
    pub end: Vec3,
    /// Recursion depth, trunk is 0
    pub level: u32,
    /// Base radius
    pub radius: f32,
    /// Tip radius
    pub thickness: f32,
    /// Index of the parent branch, `None` for the trunk
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Branch {
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize_or_zero()
    }

    /// Point at fraction `t` of the way from start to end
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.start.lerp(self.end, t)
    }

    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }
}

/// Branch hierarchy stored flat; children and parents are arena indices
#[derive(Debug, Clone, Default)]
pub struct TreeSkeleton {
    branches: Vec<Branch>,
}

impl TreeSkeleton {
    pub fn new(trunk: Branch) -> Self {
        Self {
            branches: vec![Branch { id: 0, parent: None, ..trunk }],
        }
    }

    pub fn root(&self) -> Option<&Branch> {
        self.branches.first()
    }

    pub fn get(&self, id: usize) -> Option<&Branch> {
        self.branches.get(id)
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn parent_of(&self, id: usize) -> Option<&Branch> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    /// Walk from a branch up to the trunk, excluding the branch itself
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = &Branch> + '_ {
        let mut current = self.parent_of(id);
        std::iter::from_fn(move || {
            let branch = current?;
            current = branch.parent.and_then(|p| self.get(p));
            Some(branch)
        })
    }

    pub fn max_level(&self) -> u32 {
        self.branches.iter().map(|b| b.level).max().unwrap_or(0)
    }

    /// Append a child and link it to its parent. Returns the new id.
    pub fn attach(&mut self, parent: usize, mut child: Branch) -> usize {
        let id = self.branches.len();
        child.id = id;
        child.parent = Some(parent);
        child.children.clear();
        self.branches.push(child);
        if let Some(p) = self.branches.get_mut(parent) {
            p.children.push(id);
        }
        id
    }
}

/// Recursive branch generator driven by [`TreeParams`]
pub struct TreeGeometryGenerator<R: RandomSource> {
    params: TreeParams,
    rng: R,
    capped: bool,
}

impl<R: RandomSource> TreeGeometryGenerator<R> {
    /// Params are clamped on the way in
    pub fn new(params: &TreeParams, rng: R) -> Self {
        Self {
            params: params.clamped(),
            rng,
            capped: false,
        }
    }

    /// Straight-up trunk at the origin
    pub fn generate_trunk(&self) -> Branch {
        let radius = self.params.trunk_radius;
        Branch {
            id: 0,
            start: Vec3::ZERO,
            end: Vec3::Y * self.params.trunk_height,
            level: 0,
            radius,
            thickness: radius * BRANCH_TAPER,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Attach children to `parent` (which sits at `level`) and recurse into them
    pub fn generate_branches(&mut self, skeleton: &mut TreeSkeleton, parent: usize, level: u32) {
        if level >= self.params.branch_levels {
            return;
        }
        let Some(parent_branch) = skeleton.get(parent).cloned() else {
            return;
        };

        let child_count = Self::child_count(level, self.params.branch_density);
        let child_level = level + 1;
        let nominal_length = self.params.trunk_height * LENGTH_DECAY.powi(child_level as i32);
        let radius = self.params.trunk_radius * RADIUS_DECAY.powi(child_level as i32);
        let band_start = (0.6 + level as f32 * 0.1).min(0.9);

        for i in 0..child_count {
            if skeleton.len() >= MAX_BRANCHES {
                if !self.capped {
                    log::warn!("Branch cap of {} reached, canopy truncated", MAX_BRANCHES);
                    self.capped = true;
                }
                return;
            }

            let length = (nominal_length * self.rng.range(0.8, 1.2))
                .min(parent_branch.length() * MAX_CHILD_LENGTH_RATIO);
            if length < MIN_BRANCH_LENGTH {
                continue;
            }

            let azimuth = i as f32 * TAU / child_count as f32 + self.rng.jitter(AZIMUTH_JITTER);
            let tilt = (self.params.branch_angle + self.rng.jitter(ELEVATION_JITTER_DEG))
                .clamp(0.0, MAX_TILT_DEG)
                .to_radians();
            let direction = self.branch_direction(azimuth, tilt);

            let t = self.rng.range(band_start, 0.9);
            let start = parent_branch.point_at(t);

            let child = Branch {
                id: 0,
                start,
                end: start + direction * length,
                level: child_level,
                radius,
                thickness: radius * BRANCH_TAPER,
                parent: Some(parent),
                children: Vec::new(),
            };

            let id = skeleton.attach(parent, child);
            self.generate_branches(skeleton, id, child_level);
        }
    }

    /// Full tree: trunk plus every recursive level
    pub fn generate(mut self) -> TreeSkeleton {
        let mut skeleton = TreeSkeleton::new(self.generate_trunk());
        self.generate_branches(&mut skeleton, 0, 0);
        skeleton
    }

    /// `floor((6 - level) * density)`, never negative
    pub fn child_count(level: u32, density: f32) -> usize {
        let slots = 6.0 - level as f32;
        if slots <= 0.0 || !density.is_finite() {
            return 0;
        }
        (slots * density).floor().max(0.0) as usize
    }

    fn branch_direction(&self, azimuth: f32, tilt: f32) -> Vec3 {
        let horizontal = tilt.sin() * self.params.canopy_spread;
        Vec3::new(horizontal * azimuth.cos(), tilt.cos(), horizontal * azimuth.sin()).normalize_or_zero()
    }
}

/// Generate a skeleton from the branch stream of `seed`
pub fn generate_tree(params: &TreeParams, seed: TreeSeed) -> TreeSkeleton {
    let skeleton = TreeGeometryGenerator::new(params, seed.stream(TreeSeed::BRANCH_STREAM)).generate();
    log::debug!("Generated {} branches (max level {})", skeleton.len(), skeleton.max_level());
    skeleton
}
