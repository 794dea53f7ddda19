//! A minimal built-in obstacle map.
//!
//! Real levels want a proper spatial index; this one is a flat list of
//! axis-aligned boxes, which is plenty for tests, demos and small rooms.

use bevy::prelude::*;

use crate::obstacle::{GroundDirection, Obstacle, ObstacleLayer, ObstacleMap};
use crate::state::MovMode;

/// An axis-aligned box of collision geometry occupying the inclusive
/// pixel range `[x, x + width - 1] x [y, y + height - 1]`.
#[derive(Debug, Clone, Copy)]
pub struct BoxObstacle {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels (at least 1).
    pub width: i32,
    /// Height in pixels (at least 1).
    pub height: i32,
    /// Solid, or a one-way cloud platform.
    pub solid: bool,
    /// Layer tag.
    pub layer: ObstacleLayer,
}

impl BoxObstacle {
    /// A solid box on the default layer.
    pub fn solid(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            solid: true,
            layer: ObstacleLayer::Default,
        }
    }

    /// A one-way cloud platform on the default layer.
    pub fn cloud(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            solid: false,
            ..Self::solid(x, y, width, height)
        }
    }

    /// Same box on the given layer.
    pub fn on_layer(mut self, layer: ObstacleLayer) -> Self {
        self.layer = layer;
        self
    }

    fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }
}

impl Obstacle for BoxObstacle {
    fn is_solid(&self) -> bool {
        self.solid
    }

    fn ground_position(&self, _x: i32, _y: i32, direction: GroundDirection) -> i32 {
        match direction {
            GroundDirection::Down => self.y,
            GroundDirection::Up => self.bottom(),
            GroundDirection::Right => self.x,
            GroundDirection::Left => self.right(),
        }
    }

    fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    fn overlaps_box(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        x1 <= self.right() && x2 >= self.x && y1 <= self.bottom() && y2 >= self.y
    }
}

/// A flat list of [`BoxObstacle`]s implementing [`ObstacleMap`] by linear
/// scan.
#[derive(Resource, Debug, Clone, Default)]
pub struct StaticObstacleMap {
    obstacles: Vec<BoxObstacle>,
}

impl StaticObstacleMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an obstacle.
    pub fn add(&mut self, obstacle: BoxObstacle) -> &mut Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Add a solid box on the default layer.
    pub fn add_solid(&mut self, x: i32, y: i32, width: i32, height: i32) -> &mut Self {
        self.add(BoxObstacle::solid(x, y, width, height))
    }

    /// Add a cloud platform on the default layer.
    pub fn add_cloud(&mut self, x: i32, y: i32, width: i32, height: i32) -> &mut Self {
        self.add(BoxObstacle::cloud(x, y, width, height))
    }

    /// The obstacles in insertion order.
    pub fn obstacles(&self) -> &[BoxObstacle] {
        &self.obstacles
    }

    fn visible(obstacle: &BoxObstacle, layer: ObstacleLayer) -> bool {
        obstacle.layer == ObstacleLayer::Default || obstacle.layer == layer
    }
}

impl ObstacleMap for StaticObstacleMap {
    fn best_obstacle_at(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        movmode: MovMode,
        layer: ObstacleLayer,
    ) -> Option<&dyn Obstacle> {
        let mut best: Option<&BoxObstacle> = None;
        let mut best_surface = 0;

        for obstacle in &self.obstacles {
            if !Self::visible(obstacle, layer) || !obstacle.overlaps_box(x1, y1, x2, y2) {
                continue;
            }

            // The surface closest to the mode's local up wins, so a foot
            // sensor spanning two bricks stands on the higher one.
            let (surface, wins) = match movmode {
                MovMode::Floor => {
                    let s = obstacle.ground_position(x1, y1, GroundDirection::Down);
                    (s, best.is_none() || s < best_surface)
                }
                MovMode::Ceiling => {
                    let s = obstacle.ground_position(x1, y1, GroundDirection::Up);
                    (s, best.is_none() || s > best_surface)
                }
                MovMode::LeftWall => {
                    let s = obstacle.ground_position(x1, y1, GroundDirection::Left);
                    (s, best.is_none() || s > best_surface)
                }
                MovMode::RightWall => {
                    let s = obstacle.ground_position(x1, y1, GroundDirection::Right);
                    (s, best.is_none() || s < best_surface)
                }
            };

            if wins {
                best = Some(obstacle);
                best_surface = surface;
            }
        }

        best.map(|obstacle| obstacle as &dyn Obstacle)
    }

    fn obstacle_exists(&self, x: i32, y: i32, layer: ObstacleLayer) -> bool {
        self.obstacles
            .iter()
            .any(|obstacle| Self::visible(obstacle, layer) && obstacle.contains_point(x, y))
    }
}
