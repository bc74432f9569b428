//! Numeric constants shared by the solver stages.

/// Default gravity acceleration (m/s^2) along -Y.
pub const GRAVITY: f32 = -9.81;

/// Lookahead used for predicted positions (s).
///
/// Fixed to a 120 Hz reference step so the amount of prediction does not
/// change with the frame rate or the substep count.
pub const PREDICTION_LOOKAHEAD: f32 = 1.0 / 120.0;

/// Fixed-point scale for atomic grid accumulation.
///
/// Each f32 contribution is stored as `round(value * FIXED_POINT_SCALE)` in an
/// `i64`. Resolution is 1e-6 per contribution; a node overflows only once its
/// accumulated magnitude passes ~9.2e12, far beyond any physical splat sum.
pub const FIXED_POINT_SCALE: f64 = 1_000_000.0;

/// Elements per block in the hierarchical prefix sum.
pub const SCAN_BLOCK_SIZE: usize = 512;

/// Distances below this are treated as coincident particles.
pub const DISTANCE_EPSILON: f32 = 1e-6;

/// Grid weights below this are treated as empty nodes.
pub const WEIGHT_EPSILON: f32 = 1e-6;

/// Fraction of a FLIP cell kept between particles and the domain walls.
pub const BOUNDARY_EPSILON_CELLS: f32 = 0.01;

/// Number of precomputed unit vectors in the advection jitter pool.
pub const JITTER_POOL_SIZE: usize = 256;

/// Hard cap on foam particles spawned by one fluid particle in one update.
pub const MAX_FOAM_SPAWN_PER_PARTICLE: u32 = 10;

/// Slack subtracted before rounding a grid resolution up, so a domain that is
/// an exact multiple of the cell size does not gain a cell from float noise.
pub const RESOLUTION_TOLERANCE: f32 = 1e-4;

/// Rate (1/s) at which FLIP faces under the pointer ray relax toward the
/// pointer velocity.
pub const POINTER_DRAG: f32 = 10.0;

/// Largest grid (cells, excluding the sentinel) a configuration may request.
pub const MAX_GRID_CELLS: u64 = 1 << 24;

/// Largest number of primary particles a configuration may spawn.
pub const MAX_PARTICLES: u64 = 1 << 24;
