//! Server-side board state: tiles, hidden object, click outcomes
//!
//! Tile coordinates and checkerboard base colors are fixed at generation.
//! The hidden cell is resampled uniformly on every match (re)start and never
//! leaves the server; clients only learn about it through feedback colors.

use log::debug;
use rand::Rng;
use shared::{checkerboard_color, feedback_color, GridPos, TileColor, GRID_SIZE};

#[derive(Debug, Clone)]
pub struct Tile {
    pub pos: GridPos,
    pub base: TileColor,
    pub transient: Option<TileColor>,
}

impl Tile {
    /// Color the tile currently shows.
    pub fn current_color(&self) -> TileColor {
        self.transient.unwrap_or(self.base)
    }
}

/// Result of evaluating an in-bounds click against the hidden cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Found,
    Feedback(TileColor),
}

pub struct GridState {
    tiles: Vec<Tile>,
    hidden: GridPos,
}

impl GridState {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut tiles = Vec::with_capacity((GRID_SIZE * GRID_SIZE) as usize);
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let pos = GridPos::new(x, y);
                tiles.push(Tile {
                    pos,
                    base: checkerboard_color(pos),
                    transient: None,
                });
            }
        }

        let mut grid = Self {
            tiles,
            hidden: GridPos::new(0, 0),
        };
        grid.place_hidden_object(rng);
        grid
    }

    /// Resamples the hidden cell uniformly over the whole board,
    /// independent of its previous position.
    pub fn place_hidden_object(&mut self, rng: &mut impl Rng) {
        self.hidden = GridPos::new(rng.gen_range(0..GRID_SIZE), rng.gen_range(0..GRID_SIZE));
        debug!("Hidden object placed at ({}, {})", self.hidden.x, self.hidden.y);
    }

    /// Server-side knowledge only; never put on the wire.
    pub fn hidden(&self) -> GridPos {
        self.hidden
    }

    /// Maps a click to its outcome. Out-of-bounds coordinates yield `None`
    /// and are dropped by the caller. Equality with the hidden cell is
    /// checked before any distance math, so distance zero is unreachable in
    /// the feedback branch.
    pub fn evaluate_click(&self, pos: GridPos) -> Option<ClickOutcome> {
        if !pos.in_bounds() {
            return None;
        }
        if pos == self.hidden {
            return Some(ClickOutcome::Found);
        }

        let distance = pos.manhattan_distance(self.hidden);
        Some(ClickOutcome::Feedback(feedback_color(distance)))
    }

    /// Clears every transient color, then paints the clicked tile, so
    /// feedback from earlier clicks never accumulates.
    pub fn apply_feedback(&mut self, pos: GridPos, color: TileColor) {
        self.reset_transients();
        if let Some(tile) = self.tiles.iter_mut().find(|t| t.pos == pos) {
            tile.transient = Some(color);
        }
    }

    pub fn reset_transients(&mut self) {
        for tile in &mut self.tiles {
            tile.transient = None;
        }
    }

    pub fn tile(&self, pos: GridPos) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.pos == pos)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_grid() -> GridState {
        GridState::new(&mut StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_grid_has_36_checkerboard_tiles() {
        let grid = test_grid();
        assert_eq!(grid.tiles().len(), 36);

        for tile in grid.tiles() {
            assert_eq!(tile.base, checkerboard_color(tile.pos));
            assert!(tile.transient.is_none());
            assert!(tile.pos.in_bounds());
        }
    }

    #[test]
    fn test_hidden_cell_always_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut grid = GridState::new(&mut rng);
        for _ in 0..200 {
            grid.place_hidden_object(&mut rng);
            assert!(grid.hidden().in_bounds());
        }
    }

    #[test]
    fn test_resampling_moves_the_hidden_cell_eventually() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut grid = GridState::new(&mut rng);
        let first = grid.hidden();

        let mut moved = false;
        for _ in 0..50 {
            grid.place_hidden_object(&mut rng);
            if grid.hidden() != first {
                moved = true;
                break;
            }
        }
        assert!(moved, "Hidden cell never moved across 50 resamples");
    }

    #[test]
    fn test_clicking_hidden_cell_is_found_never_feedback() {
        let grid = test_grid();
        assert_eq!(grid.evaluate_click(grid.hidden()), Some(ClickOutcome::Found));
    }

    #[test]
    fn test_click_feedback_matches_manhattan_distance() {
        let grid = test_grid();
        let hidden = grid.hidden();

        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let pos = GridPos::new(x, y);
                let outcome = grid.evaluate_click(pos).unwrap();
                let distance = pos.manhattan_distance(hidden);

                if distance == 0 {
                    assert_eq!(outcome, ClickOutcome::Found);
                } else {
                    assert_eq!(outcome, ClickOutcome::Feedback(feedback_color(distance)));
                }
            }
        }
    }

    #[test]
    fn test_out_of_bounds_click_is_rejected() {
        let grid = test_grid();
        assert_eq!(grid.evaluate_click(GridPos::new(-1, 0)), None);
        assert_eq!(grid.evaluate_click(GridPos::new(0, 6)), None);
        assert_eq!(grid.evaluate_click(GridPos::new(17, 17)), None);
    }

    #[test]
    fn test_feedback_replaces_previous_transient() {
        let mut grid = test_grid();
        let a = GridPos::new(0, 0);
        let b = GridPos::new(5, 5);

        grid.apply_feedback(a, TileColor::Red);
        assert_eq!(grid.tile(a).unwrap().transient, Some(TileColor::Red));

        grid.apply_feedback(b, TileColor::Yellow);
        assert_eq!(grid.tile(a).unwrap().transient, None);
        assert_eq!(grid.tile(b).unwrap().transient, Some(TileColor::Yellow));

        // Exactly one tile may carry a transient color at a time.
        let painted = grid.tiles().iter().filter(|t| t.transient.is_some()).count();
        assert_eq!(painted, 1);
    }

    #[test]
    fn test_reset_restores_checkerboard() {
        let mut grid = test_grid();
        grid.apply_feedback(GridPos::new(2, 3), TileColor::Orange);
        grid.reset_transients();

        for tile in grid.tiles() {
            assert_eq!(tile.current_color(), checkerboard_color(tile.pos));
        }
    }
}
