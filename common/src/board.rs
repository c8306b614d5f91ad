use serde::{Deserialize, Serialize};

/// A cell coordinate. `x` is the column, `y` is the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub fn new(x: i16, y: i16) -> Self {
        Position { x, y }
    }

    pub fn manhattan_distance(&self, other: &Position) -> u16 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u16
    }
}

/// Fixed-size row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: u16,
    height: u16,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(width: u16, height: u16, fill: T) -> Self {
        Grid {
            width,
            height,
            cells: vec![fill; width as usize * height as usize],
        }
    }
}

impl<T> Grid<T> {
    /// Build a grid from row-major cells. Returns `None` if the cell count
    /// does not match the dimensions.
    pub fn from_cells(width: u16, height: u16, cells: Vec<T>) -> Option<Self> {
        if cells.len() != width as usize * height as usize {
            return None;
        }
        Some(Grid { width, height, cells })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u16) < self.width && (pos.y as u16) < self.height
    }

    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn position_of(&self, index: usize) -> Option<Position> {
        if index >= self.cells.len() {
            return None;
        }
        let width = self.width as usize;
        Some(Position::new((index % width) as i16, (index / width) as i16))
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index_of(pos).map(move |i| &mut self.cells[i])
    }

    /// Returns false when `pos` lies outside the grid.
    pub fn set(&mut self, pos: Position, value: T) -> bool {
        match self.get_mut(pos) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).filter_map(|i| self.position_of(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        self.positions().zip(self.cells.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_is_row_major() {
        let grid = Grid::new(4, 2, 0u8);
        assert_eq!(grid.index_of(Position::new(0, 0)), Some(0));
        assert_eq!(grid.index_of(Position::new(3, 0)), Some(3));
        assert_eq!(grid.index_of(Position::new(0, 1)), Some(4));
        assert_eq!(grid.position_of(7), Some(Position::new(3, 1)));
        assert_eq!(grid.position_of(8), None);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = Grid::new(3, 3, false);
        assert!(!grid.contains(Position::new(-1, 0)));
        assert!(!grid.contains(Position::new(0, 3)));
        assert!(!grid.set(Position::new(3, 0), true));
        assert!(grid.set(Position::new(2, 2), true));
        assert_eq!(grid.get(Position::new(2, 2)), Some(&true));
    }

    #[test]
    fn test_from_cells_checks_size() {
        assert!(Grid::from_cells(2, 2, vec![1, 2, 3]).is_none());
        let grid = Grid::from_cells(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(grid.get(Position::new(1, 1)), Some(&4));
        assert_eq!(grid.iter().count(), 4);
    }
}
