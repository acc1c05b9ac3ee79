use std::sync::Arc;

use easy_ext::ext;

/// Helpers for `Arc` that make explicit the cost of cloning the pointer vs. the pointee.
#[ext(ArcExt)]
pub impl<T> Arc<T> {
    /// Clones the `Arc` pointer itself (cheap), as opposed to `T::clone`.
    fn clone_arc(&self) -> Self {
        Arc::clone(self)
    }
}

/// Obtains a mutable reference to `T`, cloning the pointee if the `Arc` is shared.
#[ext(ArcMakeMut)]
pub impl<T: Clone> Arc<T> {
    fn make_mut(self: &mut Arc<T>) -> &mut T {
        Arc::make_mut(self)
    }
}

#[ext(SlicePartitionPoint)]
pub impl<T> [T] {
    fn split_tail(&self, at: usize) -> &Self {
        &self[at.min(self.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_arc_shares_allocation() {
        let a = Arc::new(5);
        let b = a.clone_arc();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
