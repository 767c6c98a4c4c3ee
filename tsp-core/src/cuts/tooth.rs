//! Interned simple teeth for domino-parity cuts.

use super::arena::InternArena;
use super::clique::{positions_of, Clique};
use crate::error::{TspError, TspResult};
use crate::model::Tour;

/// A root city plus a body of cities not containing the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleTooth {
    pub root: usize,
    pub body: Clique,
}

/// Stable handle to an interned tooth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToothId(usize);

impl ToothId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Reference-counted store of teeth, keyed like [`super::CliqueBank`].
#[derive(Debug, Clone)]
pub struct ToothBank {
    saved_tour: Vec<usize>,
    saved_perm: Vec<usize>,
    arena: InternArena<SimpleTooth>,
}

impl ToothBank {
    pub fn new(reference: &Tour) -> Self {
        Self {
            saved_tour: reference.nodes().to_vec(),
            saved_perm: reference.perm(),
            arena: InternArena::default(),
        }
    }

    /// Intern the tooth `(root, body)`.
    ///
    /// Fails with [`TspError::DegenerateClique`] if the body is empty,
    /// contains the root, or together with the root covers every city.
    pub fn add_tooth(&mut self, root: usize, body: &[usize]) -> TspResult<ToothId> {
        let n = self.saved_tour.len();
        if root >= n {
            return Err(TspError::DegenerateClique(format!(
                "tooth root {} out of range",
                root
            )));
        }
        if body.contains(&root) {
            return Err(TspError::DegenerateClique(format!(
                "tooth body contains its root {}",
                root
            )));
        }
        if body.len() + 1 >= n {
            return Err(TspError::DegenerateClique(format!(
                "tooth with body of {} covers all {} cities",
                body.len(),
                n
            )));
        }
        let positions = positions_of(body, &self.saved_perm)?;
        let tooth = SimpleTooth {
            root,
            body: Clique::from_positions(positions),
        };
        let (idx, _) = self.arena.intern(tooth);
        Ok(ToothId(idx))
    }

    pub fn retain(&mut self, id: ToothId) -> TspResult<()> {
        if self.arena.retain(id.0) {
            Ok(())
        } else {
            Err(TspError::InconsistentState(format!(
                "retain of dead tooth {}",
                id.0
            )))
        }
    }

    pub fn release(&mut self, id: ToothId) -> TspResult<()> {
        match self.arena.release(id.0) {
            Some(_) => Ok(()),
            None => Err(TspError::InconsistentState(format!(
                "release of dead tooth {}",
                id.0
            ))),
        }
    }

    pub fn refcount(&self, id: ToothId) -> usize {
        self.arena.refcount(id.0)
    }

    pub fn get(&self, id: ToothId) -> Option<&SimpleTooth> {
        self.arena.get(id.0)
    }

    /// Root city and body membership flags of a live tooth.
    pub fn membership(&self, id: ToothId) -> TspResult<(usize, Vec<bool>)> {
        self.get(id)
            .map(|t| (t.root, t.body.membership(&self.saved_tour)))
            .ok_or_else(|| TspError::InconsistentState(format!("dead tooth {}", id.0)))
    }

    /// Body size of a live tooth.
    pub fn body_size(&self, id: ToothId) -> TspResult<usize> {
        self.get(id)
            .map(|t| t.body.size())
            .ok_or_else(|| TspError::InconsistentState(format!("dead tooth {}", id.0)))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ToothBank {
        ToothBank::new(&Tour::new(vec![4, 0, 3, 1, 5, 2, 6]).unwrap())
    }

    #[test]
    fn test_tooth_dedup() {
        let mut bank = bank();
        let a = bank.add_tooth(0, &[2, 1]).unwrap();
        let b = bank.add_tooth(0, &[1, 2]).unwrap();
        let c = bank.add_tooth(3, &[1, 2]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(bank.refcount(a), 2);
        assert_eq!(bank.len(), 2);

        let (root, body) = bank.membership(a).unwrap();
        assert_eq!(root, 0);
        assert!(body[1] && body[2] && !body[0]);
    }

    #[test]
    fn test_degenerate_teeth() {
        let mut bank = bank();
        assert!(matches!(
            bank.add_tooth(0, &[]),
            Err(TspError::DegenerateClique(_))
        ));
        assert!(bank.add_tooth(0, &[0, 1]).is_err());
        assert!(bank.add_tooth(0, &[1, 2, 3, 4, 5, 6]).is_err());
        assert!(bank.is_empty());
    }

    #[test]
    fn test_release() {
        let mut bank = bank();
        let a = bank.add_tooth(5, &[6]).unwrap();
        bank.release(a).unwrap();
        assert!(bank.get(a).is_none());
        assert!(bank.release(a).is_err());
    }
}
