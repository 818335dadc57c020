use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3, Vec4};

use crate::params::{LifeStats, TreeParams};
use crate::seed::{RandomSource, TreeSeed};
use crate::tree::TreeSkeleton;

/// Living leaves per qualifying branch at full density and ratio
pub const LEAVES_PER_BRANCH: f32 = 20.0;
/// One fallen leaf per this many days lived
pub const DAYS_PER_FALLEN_LEAF: f64 = 50.0;
pub const MAX_FALLEN_LEAVES: usize = 500;
pub const MAX_GREEN_LEAVES: usize = 20_000;
/// Green leaves sit on branches within this many levels of `branch_levels`
pub const CANOPY_LEVELS: u32 = 2;

const LEAF_OFFSET_RADIUS: f32 = 1.5;
const GROUND_INNER_RADIUS: f32 = 3.0;
const GROUND_OUTER_RADIUS: f32 = 28.0;
const GROUND_HEIGHT: f32 = 0.02;
const FALLEN_TILT: f32 = 0.2;

const GREEN_ALPHA: f32 = 0.85;
const FALLEN_ALPHA: f32 = 0.95;
const LIVING_HUES: [Vec3; 3] = [
    Vec3::new(0.18, 0.55, 0.20),
    Vec3::new(0.30, 0.69, 0.31),
    Vec3::new(0.42, 0.75, 0.25),
];
const DEAD_HUES: [Vec3; 3] = [
    Vec3::new(0.63, 0.36, 0.13),
    Vec3::new(0.76, 0.50, 0.18),
    Vec3::new(0.55, 0.27, 0.07),
];

/// A single leaf, either on the canopy or on the ground
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub position: Vec3,
    /// Euler XYZ rotation the leaf was generated with
    pub base_rotation: Vec3,
    /// Euler XYZ rotation including wind sway
    pub rotation: Vec3,
    pub size: f32,
    /// Linear RGB plus alpha
    pub color: Vec4,
    pub is_green: bool,
    /// Owning branch for living leaves. Fallen leaves belong to the ground.
    pub branch: Option<usize>,
}

impl Leaf {
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(glam::EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }
}

/// All leaves of one generated tree
#[derive(Debug, Clone, Default)]
pub struct Foliage {
    pub green: Vec<Leaf>,
    pub fallen: Vec<Leaf>,
}

impl Foliage {
    pub fn len(&self) -> usize {
        self.green.len() + self.fallen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.green.is_empty() && self.fallen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Leaf> {
        self.green.iter().chain(self.fallen.iter())
    }

    /// `green / (green + fallen)`, 0 for an empty set
    pub fn green_ratio(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.green.len() as f64 / self.len() as f64
        }
    }
}

/// `min(floor(days_lived / 50), 500)`, zero for invalid input
pub fn fallen_leaf_count(stats: &LifeStats) -> usize {
    let lived = stats.sanitized().days_lived;
    let count = (lived / DAYS_PER_FALLEN_LEAF).floor();
    if count >= MAX_FALLEN_LEAVES as f64 {
        MAX_FALLEN_LEAVES
    } else {
        count as usize
    }
}

/// Living leaves per qualifying branch, `floor(20 * leaf_density * ratio)`
pub fn leaves_per_branch(params: &TreeParams, stats: &LifeStats) -> usize {
    let count = (LEAVES_PER_BRANCH as f64 * params.leaf_density as f64 * stats.remaining_ratio()).floor();
    if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    }
}

/// Total living leaves for a canopy of `qualifying` branches.
///
/// With fallen leaves present the total is chosen so that
/// `green / (green + fallen)` tracks the remaining ratio, and `leaf_density`
/// has no effect. Without any fallen leaves (under 50 days lived) the
/// per-branch capacity, which does scale with `leaf_density`, fills the canopy.
pub fn green_leaf_count(params: &TreeParams, stats: &LifeStats, qualifying: usize) -> usize {
    let fallen = fallen_leaf_count(stats);
    let ratio = stats.remaining_ratio();

    let total = if fallen == 0 {
        leaves_per_branch(params, stats) * qualifying
    } else if ratio >= 1.0 {
        MAX_GREEN_LEAVES
    } else {
        let target = (fallen as f64 * ratio / (1.0 - ratio)).round();
        if target.is_finite() && target > 0.0 {
            target.min(MAX_GREEN_LEAVES as f64) as usize
        } else {
            0
        }
    };

    total.min(MAX_GREEN_LEAVES)
}

/// Attaches living leaves to the canopy and scatters fallen ones on the ground
pub struct FoliageDistributor<'a, R: RandomSource> {
    params: TreeParams,
    stats: LifeStats,
    skeleton: &'a TreeSkeleton,
    rng: R,
}

impl<'a, R: RandomSource> FoliageDistributor<'a, R> {
    pub fn new(skeleton: &'a TreeSkeleton, params: &TreeParams, stats: &LifeStats, rng: R) -> Self {
        Self {
            params: params.clamped(),
            stats: stats.sanitized(),
            skeleton,
            rng,
        }
    }

    /// Branch ids that carry living leaves
    pub fn canopy_branches(&self) -> Vec<usize> {
        let min_level = self.params.branch_levels.saturating_sub(CANOPY_LEVELS);
        let qualifying: Vec<usize> = self
            .skeleton
            .branches()
            .iter()
            .filter(|b| b.level >= min_level)
            .map(|b| b.id)
            .collect();

        if !qualifying.is_empty() {
            return qualifying;
        }

        // Sparse trees may never reach the canopy levels
        let deepest = self.skeleton.max_level();
        self.skeleton
            .branches()
            .iter()
            .filter(|b| b.level == deepest)
            .map(|b| b.id)
            .collect()
    }

    pub fn distribute(mut self) -> Foliage {
        let green = self.green_leaves();
        let fallen = self.fallen_leaves();
        Foliage { green, fallen }
    }

    /// Living leaves, strided evenly over the canopy branches.
    ///
    /// The arena is depth-first, so consecutive canopy ids share a subtree.
    /// Leaf `i` goes to canopy slot `i * len / total`: a sparse total still
    /// reaches every side of the crown, a dense one gives each branch
    /// `floor` or `ceil` of `total / len`.
    pub fn green_leaves(&mut self) -> Vec<Leaf> {
        let canopy = self.canopy_branches();
        if canopy.is_empty() {
            return Vec::new();
        }

        let total = green_leaf_count(&self.params, &self.stats, canopy.len());
        let mut leaves = Vec::with_capacity(total);
        for i in 0..total {
            let branch_id = canopy[i * canopy.len() / total];
            if let Some(leaf) = self.green_leaf(branch_id) {
                leaves.push(leaf);
            }
        }
        leaves
    }

    /// Fallen leaves on the ground annulus around the trunk
    pub fn fallen_leaves(&mut self) -> Vec<Leaf> {
        let count = fallen_leaf_count(&self.stats);
        (0..count).map(|_| self.fallen_leaf()).collect()
    }

    fn green_leaf(&mut self, branch_id: usize) -> Option<Leaf> {
        let branch = self.skeleton.get(branch_id)?;
        let t = self.rng.range(0.7, 1.0);

        // Random point inside a ball, biased outwards by sqrt
        let theta = self.rng.range(0.0, TAU);
        let cos_phi = self.rng.range(-1.0, 1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
        let distance = LEAF_OFFSET_RADIUS * self.rng.next_f32().sqrt();
        let offset = Vec3::new(sin_phi * theta.cos(), cos_phi, sin_phi * theta.sin()) * distance;

        let rotation = Vec3::new(
            self.rng.range(0.0, PI),
            self.rng.range(0.0, PI),
            self.rng.range(0.0, PI),
        );
        let hue = pick(&LIVING_HUES, self.rng.next_f32());
        let shade = self.rng.range(0.9, 1.1);

        Some(Leaf {
            position: branch.point_at(t) + offset,
            base_rotation: rotation,
            rotation,
            size: self.params.leaf_size * self.rng.range(0.8, 1.2),
            color: (hue * shade).extend(GREEN_ALPHA),
            is_green: true,
            branch: Some(branch_id),
        })
    }

    fn fallen_leaf(&mut self) -> Leaf {
        let angle = self.rng.range(0.0, TAU);
        // Uniform over the annulus area
        let inner_sq = GROUND_INNER_RADIUS * GROUND_INNER_RADIUS;
        let outer_sq = GROUND_OUTER_RADIUS * GROUND_OUTER_RADIUS;
        let distance = self.rng.range(inner_sq, outer_sq).sqrt();

        // Flat on the ground is a -90 degree turn about X
        let rotation = Vec3::new(
            -PI / 2.0 + self.rng.jitter(FALLEN_TILT),
            self.rng.range(0.0, TAU),
            self.rng.jitter(FALLEN_TILT),
        );
        let hue = pick(&DEAD_HUES, self.rng.next_f32());

        Leaf {
            position: Vec3::new(distance * angle.cos(), GROUND_HEIGHT, distance * angle.sin()),
            base_rotation: rotation,
            rotation,
            size: self.params.leaf_size * self.rng.range(0.8, 1.2),
            color: hue.extend(FALLEN_ALPHA),
            is_green: false,
            branch: None,
        }
    }
}

fn pick(palette: &[Vec3], roll: f32) -> Vec3 {
    let index = ((roll * palette.len() as f32) as usize).min(palette.len() - 1);
    palette[index]
}

/// Foliage from the canopy stream of `seed`
pub fn distribute_foliage(
    skeleton: &TreeSkeleton,
    params: &TreeParams,
    stats: &LifeStats,
    seed: TreeSeed,
) -> Foliage {
    let foliage = FoliageDistributor::new(skeleton, params, stats, seed.stream(TreeSeed::CANOPY_STREAM)).distribute();
    log::debug!(
        "Distributed {} green and {} fallen leaves",
        foliage.green.len(),
        foliage.fallen.len()
    );
    foliage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::generate_tree;
    use std::collections::HashMap;

    fn foliage_for(days_lived: f64, days_remaining: f64, params: &TreeParams) -> Foliage {
        let tree = generate_tree(params, TreeSeed::new(42));
        let stats = LifeStats::from_days(days_lived, days_remaining);
        distribute_foliage(&tree, params, &stats, TreeSeed::new(42))
    }

    #[test]
    fn test_fallen_count_formula() {
        for lived in [0.0, 49.0, 50.0, 99.9, 7300.0, 24_999.0, 25_000.0, 40_000.0, 1e12] {
            let stats = LifeStats::from_days(lived, 100.0);
            let expected = ((lived / 50.0).floor() as usize).min(500);
            assert_eq!(fallen_leaf_count(&stats), expected, "lived = {lived}");
        }
    }

    #[test]
    fn test_invalid_stats_give_zero_counts() {
        let params = TreeParams::default();
        let nan = LifeStats { days_lived: f64::NAN, days_remaining: f64::NAN, ..Default::default() };
        let negative = LifeStats { days_lived: -5000.0, days_remaining: -1.0, ..Default::default() };
        for stats in [nan, negative, LifeStats::default()] {
            assert_eq!(fallen_leaf_count(&stats), 0);
            assert_eq!(leaves_per_branch(&params, &stats), 0);
            assert_eq!(green_leaf_count(&params, &stats, 100), 0);
        }
    }

    #[test]
    fn test_leaves_per_branch() {
        let params = TreeParams { leaf_density: 1.0, ..Default::default() };
        assert_eq!(leaves_per_branch(&params, &LifeStats::from_days(7300.0, 14600.0)), 13);
        assert_eq!(leaves_per_branch(&params, &LifeStats::from_days(0.0, 100.0)), 20);
    }

    #[test]
    fn test_scenario_two_to_one() {
        let foliage = foliage_for(7300.0, 14600.0, &TreeParams::default());
        assert_eq!(foliage.fallen.len(), 146);
        assert_eq!(foliage.green.len(), 292);
        assert!((foliage.green_ratio() - 2.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_ratio_tracks_remaining_days() {
        let params = TreeParams::default();
        for (lived, remaining) in [
            (100.0, 30_000.0),
            (5_000.0, 20_000.0),
            (12_000.0, 12_000.0),
            (25_000.0, 3_000.0),
            (30_000.0, 30_000.0),
            (32_000.0, 50.0),
        ] {
            let foliage = foliage_for(lived, remaining, &params);
            let expected = remaining / (lived + remaining);
            assert!(
                (foliage.green_ratio() - expected).abs() < 0.01,
                "{lived}/{remaining}: {} vs {expected}",
                foliage.green_ratio()
            );
        }
    }

    #[test]
    fn test_young_life_fills_canopy() {
        let params = TreeParams::default();
        let tree = generate_tree(&params, TreeSeed::new(42));
        let stats = LifeStats::from_days(10.0, 30_000.0);
        let distributor = FoliageDistributor::new(&tree, &params, &stats, TreeSeed::new(42).stream(2));
        let canopy = distributor.canopy_branches().len();
        let foliage = distributor.distribute();

        assert!(foliage.fallen.is_empty());
        assert_eq!(foliage.green.len(), (canopy * 19).min(MAX_GREEN_LEAVES));
    }

    #[test]
    fn test_green_leaves_cover_every_trunk_child() {
        let params = TreeParams::default();
        let tree = generate_tree(&params, TreeSeed::new(42));
        let foliage = foliage_for(7300.0, 14600.0, &params);
        let trunk_children = &tree.root().unwrap().children;

        let sector_of = |branch_id: usize| {
            let branch = tree.get(branch_id).unwrap();
            if branch.level == 1 {
                return branch.id;
            }
            tree.ancestors(branch_id).find(|b| b.level == 1).unwrap().id
        };

        let mut per_sector: HashMap<usize, usize> = trunk_children.iter().map(|&id| (id, 0)).collect();
        for leaf in &foliage.green {
            *per_sector.get_mut(&sector_of(leaf.branch.unwrap())).unwrap() += 1;
        }

        assert_eq!(per_sector.len(), 6);
        for (sector, count) in &per_sector {
            assert!(*count > 0, "trunk child {sector} is bare: {per_sector:?}");
        }
    }

    #[test]
    fn test_dense_canopy_is_even() {
        let params = TreeParams::default();
        let tree = generate_tree(&params, TreeSeed::new(42));
        // 500 fallen at a 0.8 ratio: 2000 green, more than the canopy holds one each
        let stats = LifeStats::from_days(25_000.0, 100_000.0);
        let distributor = FoliageDistributor::new(&tree, &params, &stats, TreeSeed::new(42).stream(2));
        let canopy = distributor.canopy_branches();
        let foliage = distributor.distribute();
        let total = foliage.green.len();
        assert_eq!(total, 2000);
        assert!(total > canopy.len());

        let mut per_branch: HashMap<usize, usize> = HashMap::new();
        for leaf in &foliage.green {
            *per_branch.entry(leaf.branch.unwrap()).or_default() += 1;
        }
        let low = total / canopy.len();
        for id in &canopy {
            let count = per_branch.get(id).copied().unwrap_or(0);
            assert!(count == low || count == low + 1, "branch {id}: {count}");
        }
    }

    #[test]
    fn test_leaf_density_only_scales_young_canopy() {
        let tree = generate_tree(&TreeParams::default(), TreeSeed::new(4));
        let sparse = TreeParams { leaf_density: 0.5, ..Default::default() };
        let dense = TreeParams { leaf_density: 2.0, ..Default::default() };

        let young = LifeStats::from_days(10.0, 20_000.0);
        let a = distribute_foliage(&tree, &sparse, &young, TreeSeed::new(4));
        let b = distribute_foliage(&tree, &dense, &young, TreeSeed::new(4));
        assert!(b.green.len() > a.green.len());

        let older = LifeStats::from_days(7300.0, 14600.0);
        let a = distribute_foliage(&tree, &sparse, &older, TreeSeed::new(4));
        let b = distribute_foliage(&tree, &dense, &older, TreeSeed::new(4));
        assert_eq!(a.green.len(), b.green.len());
    }

    #[test]
    fn test_green_leaves_on_canopy_tips() {
        let params = TreeParams::default();
        let tree = generate_tree(&params, TreeSeed::new(42));
        let foliage = foliage_for(5_000.0, 20_000.0, &params);
        let min_level = params.branch_levels - CANOPY_LEVELS;

        for leaf in &foliage.green {
            assert!(leaf.is_green);
            let branch = tree.get(leaf.branch.unwrap()).unwrap();
            assert!(branch.level >= min_level);
            let nearest = branch.point_at(0.7).distance(leaf.position).min(branch.end.distance(leaf.position));
            assert!(nearest <= LEAF_OFFSET_RADIUS + branch.length() * 0.3 + 1e-3);
            assert!(leaf.color.w < 1.0);
        }
    }

    #[test]
    fn test_fallen_leaves_on_ground_annulus() {
        let foliage = foliage_for(20_000.0, 5_000.0, &TreeParams::default());
        assert_eq!(foliage.fallen.len(), 400);
        for leaf in &foliage.fallen {
            assert!(!leaf.is_green);
            assert!(leaf.branch.is_none());
            let distance = Vec3::new(leaf.position.x, 0.0, leaf.position.z).length();
            assert!((GROUND_INNER_RADIUS - 1e-3..=GROUND_OUTER_RADIUS + 1e-3).contains(&distance));
            assert!(leaf.position.y.abs() < 0.1);
            assert!((leaf.rotation.x + PI / 2.0).abs() <= FALLEN_TILT + 1e-5);
        }
    }

    #[test]
    fn test_sparse_tree_falls_back_to_deepest_level() {
        let params = TreeParams { branch_density: 0.3, branch_levels: 7, ..Default::default() };
        let tree = generate_tree(&params, TreeSeed::new(1));
        // floor(3 * 0.3) = 0, so growth stops at level 3
        assert!(tree.max_level() < params.branch_levels - CANOPY_LEVELS);

        let stats = LifeStats::from_days(0.0, 20_000.0);
        let distributor = FoliageDistributor::new(&tree, &params, &stats, TreeSeed::new(1).stream(2));
        let canopy = distributor.canopy_branches();
        assert!(!canopy.is_empty());
        assert!(canopy.iter().all(|&id| tree.get(id).unwrap().level == tree.max_level()));
    }

    #[test]
    fn test_stats_change_keeps_branches() {
        let params = TreeParams::default();
        let tree = generate_tree(&params, TreeSeed::new(9));
        let a = distribute_foliage(&tree, &params, &LifeStats::from_days(1000.0, 9000.0), TreeSeed::new(9));
        let b = distribute_foliage(&tree, &params, &LifeStats::from_days(9000.0, 1000.0), TreeSeed::new(9));
        assert!(a.green.len() > b.green.len());
        assert!(a.fallen.len() < b.fallen.len());
        assert_eq!(generate_tree(&params, TreeSeed::new(9)).branches(), tree.branches());
    }
}
