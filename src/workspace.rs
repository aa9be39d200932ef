//! Scratch buffers shared by every driver: the frontal workspace and the update stack (plus
//! its size-tracking LIFO).
//!
//! The update stack is deliberately a single contiguous arena addressed by a stack of
//! `(side length)` descriptors, not a list of heap blocks — contiguity is load-bearing for
//! the access pattern the drivers exercise (see `DESIGN.md`). The frontal buffer and the
//! update stack are kept as separate structs so a driver can hold a mutable view of the
//! frontal panel while repeatedly pushing/popping the stack in the same supernode step
//! without fighting the borrow checker over a single `Workspace` handle.

use faer::{MatMut, MatRef};
use problemo::{Problem, ProblemResult};

use crate::error::ChordalError;
use crate::symbolic::Symbolic;

/// The reusable `Nk x Nk` frontal panel.
pub struct FrontalBuffer {
    data: Vec<f64>,
}

impl FrontalBuffer {
    fn new(frontal_mem: usize) -> Result<Self, Problem> {
        let mut data = Vec::new();
        data.try_reserve_exact(frontal_mem).via(ChordalError::Allocation)?;
        data.resize(frontal_mem, 0.0);
        Ok(Self { data })
    }

    /// A zeroed `n x n` view of the panel for the supernode currently being processed.
    pub fn view(&mut self, n: usize) -> Result<MatMut<'_, f64>, Problem> {
        if n * n > self.data.len() {
            return Err(ChordalError::Allocation.into());
        }
        let slice = &mut self.data[..n * n];
        slice.fill(0.0);
        Ok(MatMut::from_column_major_slice_mut(slice, n, n))
    }
}

/// The LIFO arena of pending update blocks.
pub struct UpdateStack {
    data: Vec<f64>,
    used: usize,
    sizes: Vec<usize>,
    depth: usize,
}

impl UpdateStack {
    fn new(stack_mem: usize, stack_depth: usize) -> Result<Self, Problem> {
        let mut data = Vec::new();
        data.try_reserve_exact(stack_mem).via(ChordalError::Allocation)?;
        data.resize(stack_mem, 0.0);

        let mut sizes = Vec::new();
        sizes.try_reserve_exact(stack_depth).via(ChordalError::Allocation)?;

        Ok(Self {
            data,
            used: 0,
            sizes,
            depth: stack_depth,
        })
    }

    /// Pushes a new `side x side` update block, zeroed for the caller to fill in.
    pub fn push(&mut self, side: usize) -> Result<MatMut<'_, f64>, Problem> {
        if self.sizes.len() >= self.depth {
            return Err(ChordalError::Allocation.into());
        }
        let offset = self.used;
        let len = side * side;
        if offset + len > self.data.len() {
            return Err(ChordalError::Allocation.into());
        }
        self.data[offset..offset + len].fill(0.0);
        self.used += len;
        self.sizes.push(side);
        Ok(MatMut::from_column_major_slice_mut(
            &mut self.data[offset..offset + len],
            side,
            side,
        ))
    }

    /// Pops the top update block off the stack.
    pub fn pop(&mut self) -> Result<MatRef<'_, f64>, Problem> {
        let side = self.sizes.pop().ok_or(ChordalError::Allocation)?;
        let len = side * side;
        let offset = self.used - len;
        self.used = offset;
        Ok(MatRef::from_column_major_slice(
            &self.data[offset..offset + len],
            side,
            side,
        ))
    }

    /// Current stack footprint in doubles. Exposed for the stack-bounds testable property.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Current stack depth. Exposed for the stack-bounds testable property.
    pub fn depth_used(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Owns the frontal panel and the update stack for one driver invocation. Acquired on entry,
/// released on every exit path by simply being dropped.
pub struct Workspace {
    frontal: FrontalBuffer,
    stack: UpdateStack,
}

impl Workspace {
    /// Reserves the scratch buffers sized by `symb`'s memory hints.
    pub fn new(symb: &Symbolic) -> Result<Self, Problem> {
        Ok(Self {
            frontal: FrontalBuffer::new(symb.frontal_mem())?,
            stack: UpdateStack::new(symb.stack_mem(), symb.stack_depth())?,
        })
    }

    /// Splits the workspace into independent mutable handles to the frontal panel and the
    /// update stack, so a driver can hold a frontal view across repeated stack pushes/pops.
    pub fn split_mut(&mut self) -> (&mut FrontalBuffer, &mut UpdateStack) {
        (&mut self.frontal, &mut self.stack)
    }

    pub fn stack(&self) -> &UpdateStack {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_supernode_layout() -> Symbolic {
        Symbolic::new(
            3,
            vec![0, 1],
            vec![0, 1, 3],
            vec![0, 2, 4],
            vec![0, 1, 1, 2],
            vec![0, 1, 1],
            vec![0],
            vec![0, 2, 6],
            2,
            4,
            4,
        )
        .unwrap()
    }

    #[test]
    fn push_pop_round_trips_values() {
        let symb = two_supernode_layout();
        let mut ws = Workspace::new(&symb).unwrap();
        let (_, stack) = ws.split_mut();
        {
            let mut u = stack.push(2).unwrap();
            u.write(0, 0, 1.0);
            u.write(1, 0, 2.0);
            u.write(1, 1, 3.0);
        }
        assert_eq!(stack.used(), 4);
        assert_eq!(stack.depth_used(), 1);
        let popped = stack.pop().unwrap();
        assert_eq!(popped.read(0, 0), 1.0);
        assert_eq!(popped.read(1, 0), 2.0);
        assert_eq!(popped.read(1, 1), 3.0);
        assert_eq!(stack.used(), 0);
        assert_eq!(stack.depth_used(), 0);
    }

    #[test]
    fn pop_on_empty_stack_is_allocation_error() {
        let symb = two_supernode_layout();
        let mut ws = Workspace::new(&symb).unwrap();
        let (_, stack) = ws.split_mut();
        assert!(stack.pop().is_err());
    }

    #[test]
    fn frontal_view_can_coexist_with_stack_push() {
        let symb = two_supernode_layout();
        let mut ws = Workspace::new(&symb).unwrap();
        let (frontal, stack) = ws.split_mut();
        let mut f = frontal.view(2).unwrap();
        f.write(0, 0, 9.0);
        let mut u = stack.push(1).unwrap();
        u.write(0, 0, 5.0);
        assert_eq!(f.read(0, 0), 9.0);
        assert_eq!(stack.used(), 1);
    }
}
