//! N-rank array traversal
//!
//! Coordinates are produced by an odometer in row-major order: the last axis
//! varies fastest and the first axis slowest, so the walk matches the flat
//! element order. An array with any zero-length axis yields no coordinates.

use crate::error::{CloneError, CloneResult};
use crate::object::ArrayData;
use crate::value::Value;

/// Odometer over every coordinate of an array shape
#[derive(Debug, Clone)]
pub struct ArrayCursor {
    lengths: Vec<usize>,
    position: Vec<usize>,
    done: bool,
}

impl ArrayCursor {
    /// Cursor positioned at the first coordinate of `lengths`
    pub fn new(lengths: &[usize]) -> Self {
        Self {
            lengths: lengths.to_vec(),
            position: vec![0; lengths.len()],
            done: lengths.is_empty() || lengths.contains(&0),
        }
    }

    /// Current coordinate, `None` once exhausted
    pub fn current(&self) -> Option<&[usize]> {
        if self.done {
            None
        } else {
            Some(&self.position)
        }
    }

    /// Advance to the next coordinate; false once exhausted
    pub fn step(&mut self) -> bool {
        if self.done {
            return false;
        }
        for axis in (0..self.lengths.len()).rev() {
            self.position[axis] += 1;
            if self.position[axis] < self.lengths[axis] {
                return true;
            }
            self.position[axis] = 0;
        }
        self.done = true;
        false
    }
}

impl Iterator for ArrayCursor {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.current()?.to_vec();
        self.step();
        Some(current)
    }
}

/// Call `f` with every coordinate of `lengths` in row-major order
pub fn for_each_coordinate<F>(lengths: &[usize], mut f: F) -> CloneResult<()>
where
    F: FnMut(&[usize]) -> CloneResult<()>,
{
    let mut cursor = ArrayCursor::new(lengths);
    while let Some(position) = cursor.current() {
        f(position)?;
        cursor.step();
    }
    Ok(())
}

/// Replace every element of `array` with `visit(element)`, returning the
/// number of elements visited
///
/// No lock is held while `visit` runs, so it may read or write `array`.
pub fn traverse_array<F>(array: &ArrayData, mut visit: F) -> CloneResult<usize>
where
    F: FnMut(&Value) -> CloneResult<Value>,
{
    let mut visited = 0;
    for_each_coordinate(array.lengths(), |coords| {
        let out_of_bounds = || {
            CloneError::introspection(
                format!("{}[]", array.element_type()),
                format!("coordinate {:?} is out of bounds", coords),
            )
        };
        let element = array.get(coords).ok_or_else(out_of_bounds)?;
        let replaced = visit(&element)?;
        if !array.set(coords, replaced) {
            return Err(out_of_bounds());
        }
        visited += 1;
        Ok(())
    })?;
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeId, TypeRegistry};

    #[test]
    fn test_row_major_order() {
        let coords: Vec<_> = ArrayCursor::new(&[2, 3]).collect();
        assert_eq!(
            coords,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
            ]
        );
    }

    #[test]
    fn test_current_tracks_iteration() {
        let mut cursor = ArrayCursor::new(&[1, 2]);
        assert_eq!(cursor.current(), Some(&[0, 0][..]));
        assert_eq!(cursor.next(), Some(vec![0, 0]));
        assert_eq!(cursor.current(), Some(&[0, 1][..]));
        assert_eq!(cursor.next(), Some(vec![0, 1]));
        assert_eq!(cursor.current(), None);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_zero_length_axis_yields_nothing() {
        assert_eq!(ArrayCursor::new(&[3, 0, 2]).count(), 0);
        assert_eq!(ArrayCursor::new(&[0]).count(), 0);
        assert_eq!(ArrayCursor::new(&[]).count(), 0);
    }

    #[test]
    fn test_rank_three_covers_every_coordinate() {
        let mut seen = 0;
        for_each_coordinate(&[2, 3, 4], |coords| {
            assert_eq!(coords.len(), 3);
            seen += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 24);
    }

    #[test]
    fn test_traverse_writes_back() {
        let mut registry = TypeRegistry::new();
        let grid_type = registry.array_type(TypeId::OBJECT, 2).unwrap();
        let grid = registry.new_array(grid_type, &[2, 2]).unwrap();
        let array = grid.as_array().unwrap();

        let mut next = 0;
        let visited = traverse_array(array, |_| {
            next += 1;
            Ok(Value::int32(next))
        })
        .unwrap();

        assert_eq!(visited, 4);
        assert_eq!(array.get(&[0, 1]).unwrap().as_int32(), Some(2));
        assert_eq!(array.get(&[1, 0]).unwrap().as_int32(), Some(3));
    }

    #[test]
    fn test_traverse_propagates_errors() {
        let mut registry = TypeRegistry::new();
        let list_type = registry.array_type(TypeId::OBJECT, 1).unwrap();
        let list = registry.new_array(list_type, &[3]).unwrap();
        let result = traverse_array(list.as_array().unwrap(), |_| {
            Err(CloneError::introspection("Thing", "boom"))
        });
        assert!(result.is_err());
    }
}
