//! Domain constants for a double-six domino table.

/// Highest pip value on a double-six set.
pub const MAX_PIP: u8 = 6;

/// Number of unique tiles in a double-six set.
pub const TILE_COUNT: usize = 28;

/// Tiles dealt to each actor at the start of a table.
pub const HAND_SIZE: usize = 7;

/// Fewest actors a table can run with.
pub const MIN_ACTORS: usize = 2;

/// Most actors a table can seat (4 * 7 = 28 tiles, empty pool).
pub const MAX_ACTORS: usize = 4;

/// Nominal hand capacity. Hands grow past this if an actor keeps drawing.
pub const HAND_CAPACITY: usize = 14;

/// Nominal pool capacity.
pub const POOL_CAPACITY: usize = 28;

/// Nominal train capacity.
pub const TRAIN_CAPACITY: usize = 128;

/// Default step ceiling before a table is force-terminated.
pub const DEFAULT_MAX_STEPS: u64 = 800;

/// Default quantum reported for non round-robin policies.
pub const DEFAULT_QUANTUM_MS: u64 = 200;

/// Default quantum while round-robin is active.
pub const ROUND_ROBIN_QUANTUM_MS: u64 = 120;

/// Default turn cooldown.
pub const DEFAULT_COOLDOWN_MS: u64 = 0;
