//! Per-table allocation state: hands, pool and train.

use serde::{Deserialize, Serialize};

use super::{
    constants::TILE_COUNT,
    entities::{ActorId, Hand, Pips, Pool, Side, Tile, Train},
};

/// What a scheduling decision needs to know about one actor.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActorLoad {
    /// Tiles still held.
    pub units: usize,
    /// Summed pip cost of those tiles.
    pub cost: u32,
}

impl ActorLoad {
    #[must_use]
    pub const fn new(units: usize, cost: u32) -> Self {
        Self { units, cost }
    }
}

impl From<&Hand> for ActorLoad {
    fn from(hand: &Hand) -> Self {
        Self::new(hand.len(), hand.cost())
    }
}

/// Actor with the lowest cost; ties go to fewer units, then the lowest id.
#[must_use]
pub fn lowest_cost_actor(loads: &[ActorLoad]) -> Option<ActorId> {
    loads
        .iter()
        .enumerate()
        .min_by_key(|(actor, load)| (load.cost, load.units, *actor))
        .map(|(actor, _)| actor)
}

/// Actor with the fewest units; ties go to the lowest id.
#[must_use]
pub fn fewest_units_actor(loads: &[ActorLoad]) -> Option<ActorId> {
    loads
        .iter()
        .enumerate()
        .min_by_key(|(actor, load)| (load.units, *actor))
        .map(|(actor, _)| actor)
}

/// The opening move picked from the freshly dealt hands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Opening {
    pub actor: ActorId,
    pub tile: Tile,
}

/// Locates the opening tile: the highest double anywhere, otherwise the
/// highest pip sum. Exact ties keep the first tile found scanning actors in
/// order.
#[must_use]
pub fn opening_position(hands: &[Hand]) -> Option<(ActorId, usize)> {
    // (actor, idx, is_double, value)
    let mut best: Option<(ActorId, usize, bool, u32)> = None;
    for (actor, hand) in hands.iter().enumerate() {
        for (idx, tile) in hand.iter().enumerate() {
            let candidate = if tile.is_double() {
                (true, u32::from(tile.0))
            } else {
                (false, tile.cost())
            };
            let better = match best {
                None => true,
                Some((_, _, best_double, best_value)) => match (candidate.0, best_double) {
                    (true, false) => true,
                    (false, true) => false,
                    _ => candidate.1 > best_value,
                },
            };
            if better {
                best = Some((actor, idx, candidate.0, candidate.1));
            }
        }
    }
    best.map(|(actor, idx, _, _)| (actor, idx))
}

/// Reasons the board refuses a play.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayRejection {
    NoSuchActor,
    NoSuchTile,
    DoesNotConnect,
}

/// Hands, pool and train of one table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Board {
    hands: Vec<Hand>,
    pool: Pool,
    train: Train,
}

impl Board {
    /// Plays the opening tile out of `hands` and builds the board around it.
    /// Returns `None` if no actor holds a tile.
    #[must_use]
    pub fn open(mut hands: Vec<Hand>, pool: Pool) -> Option<(Self, Opening)> {
        let (actor, idx) = opening_position(&hands)?;
        let tile = hands[actor].take(idx)?;
        let board = Self {
            hands,
            pool,
            train: Train::starting_with(tile),
        };
        Some((board, Opening { actor, tile }))
    }

    /// Builds a board mid-game. Mostly useful for tests and benchmarks.
    #[must_use]
    pub fn from_parts(hands: Vec<Hand>, pool: Pool, train: Train) -> Self {
        Self { hands, pool, train }
    }

    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.hands.len()
    }

    #[must_use]
    pub fn hand(&self, actor: ActorId) -> Option<&Hand> {
        self.hands.get(actor)
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    #[must_use]
    pub fn train(&self) -> &Train {
        &self.train
    }

    #[must_use]
    pub fn ends(&self) -> (Pips, Pips) {
        self.train.ends()
    }

    #[must_use]
    pub fn loads(&self) -> Vec<ActorLoad> {
        self.hands.iter().map(ActorLoad::from).collect()
    }

    /// Every tile on the table: hands, pool and train.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.hands.iter().map(Hand::len).sum::<usize>() + self.pool.len() + self.train.len()
    }

    /// True when the board still holds the whole set.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.unit_count() == TILE_COUNT
    }

    /// First legal placement for `actor`: the left end is tried before the
    /// right end, each in hand order.
    #[must_use]
    pub fn find_play(&self, actor: ActorId) -> Option<(usize, Side)> {
        let hand = self.hands.get(actor)?;
        let (left, right) = self.train.ends();
        hand.position_matching(left)
            .map(|idx| (idx, Side::Left))
            .or_else(|| hand.position_matching(right).map(|idx| (idx, Side::Right)))
    }

    /// Moves the tile at `idx` from `actor`'s hand onto the train.
    pub fn play(&mut self, actor: ActorId, idx: usize, side: Side) -> Result<Tile, PlayRejection> {
        let hand = self.hands.get_mut(actor).ok_or(PlayRejection::NoSuchActor)?;
        let tile = *hand.get(idx).ok_or(PlayRejection::NoSuchTile)?;
        if !self.train.accepts(&tile, side) {
            return Err(PlayRejection::DoesNotConnect);
        }
        hand.take(idx);
        self.train
            .attach(tile, side)
            .map_err(|_| PlayRejection::DoesNotConnect)?;
        Ok(tile)
    }

    /// Moves one tile from the pool into `actor`'s hand.
    pub fn draw(&mut self, actor: ActorId) -> Option<Tile> {
        let hand = self.hands.get_mut(actor)?;
        let tile = self.pool.draw()?;
        hand.push(tile);
        Some(tile)
    }
}
