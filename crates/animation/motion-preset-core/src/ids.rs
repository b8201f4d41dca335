//! Identifiers and a simple allocator for targets and applied animations.

use serde::{Deserialize, Serialize};

/// Opaque handle for an animatable target, issued by [`crate::PlaybackManager::register`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u32);

/// Identifies one applied keyframe rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimationId(pub u32);

/// Monotonic allocator for TargetId and AnimationId.
/// Ids are never reused within one allocator, so stale handles stay stale.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_target: u32,
    next_animation: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_target(&mut self) -> TargetId {
        let id = TargetId(self.next_target);
        self.next_target = self.next_target.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_animation(&mut self) -> AnimationId {
        let id = AnimationId(self.next_animation);
        self.next_animation = self.next_animation.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_target(), TargetId(0));
        assert_eq!(alloc.alloc_target(), TargetId(1));
        assert_eq!(alloc.alloc_animation(), AnimationId(0));
        assert_eq!(alloc.alloc_animation(), AnimationId(1));
    }
}
