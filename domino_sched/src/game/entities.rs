use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

use super::constants::{HAND_CAPACITY, HAND_SIZE, MAX_PIP, POOL_CAPACITY, TILE_COUNT, TRAIN_CAPACITY};

/// Placeholder for pip values (0..=6).
pub type Pips = u8;

/// Seat index of an actor at its table.
pub type ActorId = usize;

/// Index of a table within a simulation.
pub type TableId = usize;

/// A domino tile: an unordered pair of pip values.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Tile(pub Pips, pub Pips);

impl Tile {
    #[must_use]
    pub const fn new(a: Pips, b: Pips) -> Self {
        Self(a, b)
    }

    #[must_use]
    pub const fn is_double(&self) -> bool {
        self.0 == self.1
    }

    /// Sum of both endpoints.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.0 as u32 + self.1 as u32
    }

    #[must_use]
    pub const fn matches(&self, end: Pips) -> bool {
        self.0 == end || self.1 == end
    }

    /// The endpoint left exposed after connecting this tile to `end`.
    #[must_use]
    pub const fn other_end(&self, end: Pips) -> Option<Pips> {
        if self.0 == end {
            Some(self.1)
        } else if self.1 == end {
            Some(self.0)
        } else {
            None
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}|{}]", self.0, self.1)
    }
}

/// End of the train an action targets.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Left => "left",
            Self::Right => "right",
        };
        write!(f, "{repr}")
    }
}

/// Full double-six set. Built in canonical order; call [`Deck::shuffle`]
/// before dealing.
#[derive(Debug)]
pub struct Deck {
    tiles: Vec<Tile>,
}

impl Deck {
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tiles.shuffle(rng);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Deals [`HAND_SIZE`] tiles to each actor in order; the rest become the pool.
    #[must_use]
    pub fn deal(self, actors: usize) -> (Vec<Hand>, Pool) {
        let mut tiles = self.tiles.into_iter();
        let hands = (0..actors)
            .map(|_| Hand::from_tiles(tiles.by_ref().take(HAND_SIZE).collect()))
            .collect();
        let pool = Pool::from_tiles(tiles.collect());
        (hands, pool)
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut tiles = Vec::with_capacity(TILE_COUNT);
        for a in 0..=MAX_PIP {
            for b in a..=MAX_PIP {
                tiles.push(Tile(a, b));
            }
        }
        Self { tiles }
    }
}

/// Tiles privately held by one actor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Hand {
    tiles: Vec<Tile>,
}

impl Hand {
    #[must_use]
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        let mut hand = Vec::with_capacity(HAND_CAPACITY.max(tiles.len()));
        hand.extend(tiles);
        Self { tiles: hand }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Tile> {
        self.tiles.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Summed pip cost of every held tile.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.tiles.iter().map(Tile::cost).sum()
    }

    /// First tile (by hand order) that connects to `end`.
    #[must_use]
    pub fn position_matching(&self, end: Pips) -> Option<usize> {
        self.tiles.iter().position(|t| t.matches(end))
    }

    pub fn push(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    /// Removes the tile at `idx`, preserving the order of the rest.
    pub fn take(&mut self, idx: usize) -> Option<Tile> {
        (idx < self.tiles.len()).then(|| self.tiles.remove(idx))
    }
}

/// Undealt tiles shared by a table. Draws come off the back.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pool {
    tiles: Vec<Tile>,
}

impl Pool {
    #[must_use]
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        let mut pool = Vec::with_capacity(POOL_CAPACITY.max(tiles.len()));
        pool.extend(tiles);
        Self { tiles: pool }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn draw(&mut self) -> Option<Tile> {
        self.tiles.pop()
    }
}

/// The committed chain of tiles with two open ends.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Train {
    tiles: VecDeque<Tile>,
    left: Pips,
    right: Pips,
}

impl Train {
    /// Starts a train from the opening tile. The first endpoint becomes the
    /// left end, the second the right end.
    #[must_use]
    pub fn starting_with(tile: Tile) -> Self {
        let mut tiles = VecDeque::with_capacity(TRAIN_CAPACITY);
        tiles.push_back(tile);
        Self {
            tiles,
            left: tile.0,
            right: tile.1,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub const fn end(&self, side: Side) -> Pips {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[must_use]
    pub const fn ends(&self) -> (Pips, Pips) {
        (self.left, self.right)
    }

    #[must_use]
    pub const fn accepts(&self, tile: &Tile, side: Side) -> bool {
        tile.matches(self.end(side))
    }

    /// Connects `tile` to the given end, exposing its other endpoint.
    /// Hands the tile back if it doesn't connect.
    pub fn attach(&mut self, tile: Tile, side: Side) -> Result<(), Tile> {
        let Some(exposed) = tile.other_end(self.end(side)) else {
            return Err(tile);
        };
        match side {
            Side::Left => {
                self.tiles.push_front(tile);
                self.left = exposed;
            }
            Side::Right => {
                self.tiles.push_back(tile);
                self.right = exposed;
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }
}

impl fmt::Display for Train {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for tile in &self.tiles {
            write!(f, "{tile}")?;
        }
        Ok(())
    }
}
