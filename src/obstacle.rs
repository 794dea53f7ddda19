//! Obstacle abstraction.
//!
//! The simulation never walks level geometry itself: it consumes an
//! [`ObstacleMap`] borrowed for the duration of one tick, and the
//! obstacles it returns. Implement these traits to plug the controller
//! into your own spatial index (a tile grid, a quadtree, a brick list).
//! A minimal built-in implementation lives in [`crate::map`].

use crate::state::MovMode;

/// Direction of travel used to query an obstacle surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundDirection {
    /// Moving down; the relevant surface is the obstacle's top.
    Down,
    /// Moving up; the relevant surface is the obstacle's bottom.
    Up,
    /// Moving left; the relevant surface is the obstacle's right side.
    Left,
    /// Moving right; the relevant surface is the obstacle's left side.
    Right,
}

/// Layer tag forwarded to the obstacle map.
///
/// Layered geometry lets a level cross over itself (loops, bridges): an
/// obstacle on a colored layer only collides with an actor on the same
/// layer, while default-layer obstacles collide with everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObstacleLayer {
    /// Collides with actors on any layer.
    #[default]
    Default,
    /// Collides only with actors on the green layer.
    Green,
    /// Collides only with actors on the yellow layer.
    Yellow,
}

/// A single piece of static collision geometry.
pub trait Obstacle {
    /// Solid obstacles collide from every direction; non-solid ones
    /// ("clouds") only catch descending foot sensors.
    fn is_solid(&self) -> bool;

    /// Coordinate of the obstacle surface first hit when travelling
    /// toward `direction` through the point `(x, y)`: the y of the top
    /// or bottom edge for `Down`/`Up`, the x of the right or left edge
    /// for `Left`/`Right`.
    fn ground_position(&self, x: i32, y: i32, direction: GroundDirection) -> i32;

    /// Does the obstacle occupy this pixel?
    fn contains_point(&self, x: i32, y: i32) -> bool;

    /// Does the obstacle overlap this inclusive pixel box?
    fn overlaps_box(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool;
}

/// A spatial index of obstacles, borrowed by the actor for one tick.
pub trait ObstacleMap: Send + Sync {
    /// The most relevant obstacle intersecting the inclusive pixel box
    /// `(x1, y1)-(x2, y2)`, or `None`. "Most relevant" is the obstacle
    /// whose surface sits highest relative to the movement mode's local
    /// up, so a foot sensor spanning several obstacles lands on the one
    /// the actor should stand on.
    fn best_obstacle_at(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        movmode: MovMode,
        layer: ObstacleLayer,
    ) -> Option<&dyn Obstacle>;

    /// Is there any obstacle at this pixel?
    fn obstacle_exists(&self, x: i32, y: i32, layer: ObstacleLayer) -> bool {
        self.best_obstacle_at(x, y, x, y, MovMode::Floor, layer)
            .is_some()
    }
}

/// Obstacle identity: maps hand out borrows, so two readings refer to the
/// same obstacle exactly when they point at the same place.
#[inline]
pub(crate) fn same_obstacle(a: &dyn Obstacle, b: &dyn Obstacle) -> bool {
    std::ptr::addr_eq(a as *const dyn Obstacle, b as *const dyn Obstacle)
}
