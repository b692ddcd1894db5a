//! Cancellation handles for externally driven animations.
//!
//! Renderables never run animations themselves. Whatever drives an animation
//! keeps an [`AnimationHandle`] and checks it before every property mutation;
//! the renderable keeps a clone in its [`Animations`] set and kills all of them
//! when it is destroyed, so a tween can never write into a released object.

use std::{cell::Cell, rc::Rc};

use crate::data_structures::transform::Transform;

#[derive(Clone, Debug)]
pub struct AnimationHandle(Rc<Cell<bool>>);

impl AnimationHandle {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn kill(&self) {
        self.0.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.0.get()
    }
}

impl Default for AnimationHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct Animations {
    handles: Vec<AnimationHandle>,
}

impl Animations {
    pub fn add(&mut self, handle: AnimationHandle) {
        self.handles.retain(AnimationHandle::is_active);
        self.handles.push(handle);
    }

    pub fn kill_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.kill();
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// `power4.inOut` easing.
pub fn ease_power4_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        8.0 * t.powi(4)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
    }
}

/// An endlessly repeating back-and-forth tween between two transforms.
#[derive(Debug)]
pub struct Tween {
    from: Transform,
    to: Transform,
    duration: f32,
    elapsed: f32,
    handle: AnimationHandle,
}

impl Tween {
    pub fn yoyo(from: Transform, to: Transform, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(f32::EPSILON),
            elapsed: 0.0,
            handle: AnimationHandle::new(),
        }
    }

    pub fn handle(&self) -> AnimationHandle {
        self.handle.clone()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Step by `dt` seconds and return the new transform, or `None` once killed.
    pub fn advance(&mut self, dt: f32) -> Option<Transform> {
        if !self.handle.is_active() {
            return None;
        }
        self.elapsed += dt;
        let cycles = self.elapsed / self.duration;
        let mut progress = cycles.fract();
        if cycles as u64 % 2 == 1 {
            progress = 1.0 - progress;
        }
        Some(self.from.lerp(&self.to, ease_power4_in_out(progress)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_is_seen_by_every_clone() {
        let handle = AnimationHandle::new();
        let clone = handle.clone();
        clone.kill();
        assert!(!handle.is_active());
    }

    #[test]
    fn kill_all_empties_the_set() {
        let mut animations = Animations::default();
        let a = AnimationHandle::new();
        let b = AnimationHandle::new();
        animations.add(a.clone());
        animations.add(b.clone());
        animations.kill_all();
        animations.kill_all();
        assert!(animations.is_empty());
        assert!(!a.is_active() && !b.is_active());
    }

    #[test]
    fn add_drops_finished_handles() {
        let mut animations = Animations::default();
        let done = AnimationHandle::new();
        animations.add(done.clone());
        done.kill();
        animations.add(AnimationHandle::new());
        assert_eq!(animations.len(), 1);
    }

    #[test]
    fn easing_hits_the_ends_and_midpoint() {
        assert_eq!(ease_power4_in_out(0.0), 0.0);
        assert_eq!(ease_power4_in_out(1.0), 1.0);
        assert!((ease_power4_in_out(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn yoyo_returns_to_start() {
        let from = Transform::default();
        let to = Transform {
            position: [4.0, 0.0, 0.0],
            ..Default::default()
        };
        let mut tween = Tween::yoyo(from, to, 1.0);
        let at_end = tween.advance(0.999).unwrap();
        assert!(at_end.position[0] > 3.9);
        let back = tween.advance(1.0).unwrap();
        assert!(back.position[0] < 0.1);
    }

    #[test]
    fn killed_tween_stops() {
        let mut tween = Tween::yoyo(Transform::default(), Transform::default(), 1.0);
        tween.handle().kill();
        assert!(tween.advance(0.1).is_none());
    }
}
