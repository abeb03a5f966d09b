use serde::{Deserialize, Serialize};

use crate::id::CellId;

/// 2-D padded shape of a state cell. Scalars are `1 x 1`, vectors `n x 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn scalar() -> Self {
        Self { rows: 1, cols: 1 }
    }

    pub fn vector(n: usize) -> Self {
        Self { rows: n, cols: 1 }
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn size(&self) -> usize {
        self.rows * self.cols
    }
}

/// Element strides of a cell view (row stride, column stride).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strides {
    pub row: usize,
    pub col: usize,
}

impl Strides {
    /// Contiguous row-major strides for the given shape.
    pub fn contiguous(shape: Shape) -> Self {
        Self {
            row: shape.cols,
            col: 1,
        }
    }
}

/// Canonical reference to (a view of) a state cell, as carried in operator
/// footprints and rendered into records: identity key, shape, strides, offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub key: CellId,
    pub shape: Shape,
    pub strides: Strides,
    pub offset: usize,
}

impl CellRef {
    /// A reference known only by its identity key. Used when decoding records
    /// that carry bare keys (Send/Recv/Wait placeholders); the runtime looks
    /// the cell up by key.
    pub fn key_only(key: CellId) -> Self {
        Self {
            key,
            shape: Shape::scalar(),
            strides: Strides::contiguous(Shape::scalar()),
            offset: 0,
        }
    }
}

/// A base state cell registered in the arena: label, shape and initial
/// contents. Views do not live here; they are `CellRef`s sharing the base key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub label: String,
    pub shape: Shape,
    pub data: Vec<f64>,
}

/// Arena of base state cells. Registration order defines identity: the arena
/// index is the stable identity key used everywhere (serialization, footprint
/// membership, merge bookkeeping).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellArena {
    cells: Vec<Cell>,
}

impl CellArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base cell with zero-initialized contents.
    pub fn register(&mut self, label: impl Into<String>, shape: Shape) -> CellId {
        self.register_with(label, shape, vec![0.0; shape.size()])
    }

    /// Register a base cell with explicit initial contents.
    pub fn register_with(
        &mut self,
        label: impl Into<String>,
        shape: Shape,
        data: Vec<f64>,
    ) -> CellId {
        debug_assert_eq!(data.len(), shape.size());
        let id = CellId(self.cells.len() as u32);
        self.cells.push(Cell {
            label: label.into(),
            shape,
            data,
        });
        id
    }

    pub fn get(&self, id: CellId) -> &Cell {
        &self.cells[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// A full (contiguous, zero-offset) reference to a base cell.
    pub fn full_ref(&self, id: CellId) -> CellRef {
        let shape = self.get(id).shape;
        CellRef {
            key: id,
            shape,
            strides: Strides::contiguous(shape),
            offset: 0,
        }
    }

    /// A view of a base cell through a different shape/strides/offset.
    /// The view shares the base cell's identity key.
    pub fn view(&self, base: CellId, shape: Shape, strides: Strides, offset: usize) -> CellRef {
        CellRef {
            key: base,
            shape,
            strides,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_reproducible() {
        let mut arena = CellArena::new();
        let a = arena.register("a", Shape::vector(4));
        let b = arena.register("b", Shape::scalar());

        assert_ne!(a, b);
        assert_eq!(arena.full_ref(a).key, arena.full_ref(a).key);
    }

    #[test]
    fn view_shares_base_identity() {
        let mut arena = CellArena::new();
        let base = arena.register("base", Shape::matrix(3, 2));

        let view = arena.view(base, Shape::vector(2), Strides { row: 1, col: 1 }, 2);
        assert_eq!(view.key, base);
        assert_eq!(view.key, arena.full_ref(base).key);
        assert_ne!(view.shape, arena.get(base).shape);
    }

    #[test]
    fn shapes_pad_to_two_dims() {
        assert_eq!(Shape::scalar().size(), 1);
        assert_eq!(Shape::vector(5), Shape::matrix(5, 1));
        assert_eq!(Strides::contiguous(Shape::matrix(3, 4)), Strides { row: 4, col: 1 });
    }
}
