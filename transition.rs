//! Position transitions
//!
//! When the layout changes, a fountain glides from wherever it is to its
//! new slot on the ground plane instead of jumping there.

/// Quadratic ease-in-out over `[0, 1]`.
pub fn ease_quad_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t / 2.0
    } else {
        let t = t - 1.0;
        (t * (2.0 - t) + 1.0) / 2.0
    }
}

/// Planar (x, z) glide between layout slots; the vertical axis is fixed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionTransition {
    old_position: [f32; 3],
    new_position: [f32; 3],
    current_position: [f32; 3],
    move_start: u64,
    move_duration_ms: u64,
}

impl PositionTransition {
    pub fn new(position: [f32; 3], move_duration_ms: u64) -> Self {
        Self {
            old_position: position,
            new_position: position,
            current_position: position,
            move_start: 0,
            move_duration_ms: move_duration_ms.max(1),
        }
    }

    /// Feed the requested planar target. A target that differs from the
    /// last one restarts the glide from the current position. Callers must
    /// pass finite coordinates.
    pub fn retarget(&mut self, target: [f32; 2], now: u64) {
        let [x, z] = target;
        if x == self.new_position[0] && z == self.new_position[2] {
            return;
        }
        self.old_position = self.current_position;
        self.new_position[0] = x;
        self.new_position[2] = z;
        self.move_start = now;
    }

    /// Move the current position along the glide for time `now`.
    pub fn advance(&mut self, now: u64) -> [f32; 3] {
        if self.is_moving() {
            let progress =
                now.saturating_sub(self.move_start) as f32 / self.move_duration_ms as f32;
            if progress >= 1.0 {
                // Snap so no float residue is left behind
                self.current_position[0] = self.new_position[0];
                self.current_position[2] = self.new_position[2];
            } else {
                let eased = ease_quad_in_out(progress);
                for axis in [0, 2] {
                    let from = self.old_position[axis];
                    let to = self.new_position[axis];
                    // Clamp away rounding that would leave the old/new box
                    self.current_position[axis] =
                        (from + (to - from) * eased).clamp(from.min(to), from.max(to));
                }
            }
        }
        self.current_position
    }

    pub fn is_moving(&self) -> bool {
        self.current_position[0] != self.new_position[0]
            || self.current_position[2] != self.new_position[2]
    }

    pub fn current(&self) -> [f32; 3] {
        self.current_position
    }

    pub fn target(&self) -> [f32; 3] {
        self.new_position
    }

    pub fn set_move_duration(&mut self, move_duration_ms: u64) {
        self.move_duration_ms = move_duration_ms.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn between(value: f32, a: f32, b: f32) -> bool {
        value >= a.min(b) && value <= a.max(b)
    }

    #[test]
    fn easing_endpoints_and_midpoint() {
        assert_eq!(ease_quad_in_out(0.0), 0.0);
        assert_eq!(ease_quad_in_out(0.5), 0.5);
        assert_eq!(ease_quad_in_out(1.0), 1.0);
        assert_eq!(ease_quad_in_out(0.25), 0.125);
        assert_eq!(ease_quad_in_out(0.75), 0.875);
    }

    #[test]
    fn easing_is_monotonic() {
        let mut previous = 0.0;
        for step in 0..=100 {
            let eased = ease_quad_in_out(step as f32 / 100.0);
            assert!(eased >= previous);
            previous = eased;
        }
    }

    #[test]
    fn glide_halfway_uses_easing() {
        let mut transition = PositionTransition::new([0.0; 3], 5000);
        transition.retarget([100.0, 0.0], 0);

        let position = transition.advance(2500);
        assert!(position[0] > 0.0 && position[0] < 100.0);
        assert_eq!(position[0], 100.0 * ease_quad_in_out(0.5));
        assert_eq!(position[2], 0.0);
    }

    #[test]
    fn glide_snaps_at_end() {
        let mut transition = PositionTransition::new([13.0, 5.0, -7.0], 5000);
        transition.retarget([-391.0, 84.0], 1_000);
        transition.advance(3_000);
        let end = transition.advance(6_000);
        assert_eq!(end, [-391.0, 5.0, 84.0]);
        assert!(!transition.is_moving());
    }

    #[test]
    fn glide_stays_inside_bounds() {
        let mut transition = PositionTransition::new([10.0, 0.0, 200.0], 5000);
        transition.retarget([-50.0, 20.0], 0);
        for now in (0..=5_000).step_by(50) {
            let [x, _, z] = transition.advance(now);
            assert!((-50.0..=10.0).contains(&x), "x {x} at {now}");
            assert!((20.0..=200.0).contains(&z), "z {z} at {now}");
        }
    }

    #[test]
    fn retarget_mid_glide_starts_from_current() {
        let mut transition = PositionTransition::new([0.0; 3], 5000);
        transition.retarget([100.0, 0.0], 0);
        let midway = transition.advance(2500);

        transition.retarget([0.0, 100.0], 2500);
        let start = transition.advance(2500);
        assert_eq!(start, midway);

        let end = transition.advance(7500);
        assert_eq!(end, [0.0, 0.0, 100.0]);
    }

    #[test]
    fn same_target_does_not_restart() {
        let mut transition = PositionTransition::new([0.0; 3], 5000);
        transition.retarget([100.0, 0.0], 0);
        transition.advance(2500);
        transition.retarget([100.0, 0.0], 2500);
        assert_eq!(transition.advance(5000)[0], 100.0);
    }

    proptest! {
        #[test]
        fn glide_never_leaves_old_new_box(
            duration in 1u64..10_000,
            events in prop::collection::vec(
                (0u64..3_000, prop::option::of((-1000.0f32..1000.0, -1000.0f32..1000.0))),
                1..60,
            ),
        ) {
            let mut transition = PositionTransition::new([0.0, 7.0, 0.0], duration);
            let mut from = transition.current();
            let mut to = transition.target();
            let mut now = 0;
            for (gap, retarget) in events {
                now += gap;
                if let Some((x, z)) = retarget {
                    let before = transition.current();
                    let previous = transition.target();
                    transition.retarget([x, z], now);
                    if transition.target() != previous {
                        from = before;
                        to = transition.target();
                    }
                }
                let [x, y, z] = transition.advance(now);
                prop_assert!(between(x, from[0], to[0]), "x {} outside {} {}", x, from[0], to[0]);
                prop_assert!(between(z, from[2], to[2]), "z {} outside {} {}", z, from[2], to[2]);
                prop_assert_eq!(y, 7.0);
            }

            let end = transition.advance(now + duration);
            prop_assert_eq!(end, to);
            prop_assert!(!transition.is_moving());
        }
    }
}
