use serde::{Deserialize, Serialize};

use crate::global_variables::{
    CANVAS_HEIGHT, CANVAS_WIDTH, CLEARANCE_MARGIN, EXIT_MARGIN, FAR_SIDE_SETBACK, GAP_SIZE,
    LANE_CENTER_SHIFT, NEAR_SIDE_SETBACK, ROAD_WIDTH, SAFE_SPAWN_GAP, SPAWN_DISTANCE,
    STOP_LINE_OFFSET,
};
use crate::simulation_engine::vehicles::{Axis, Direction};

/// A point on the simulation canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn set_along(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
    }
}

/// Axis-aligned open rectangle; points on the border are outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub min: Position,
    pub max: Position,
}

impl Zone {
    pub fn contains(&self, p: Position) -> bool {
        self.min.x < p.x && p.x < self.max.x && self.min.y < p.y && p.y < self.max.y
    }
}

/// Signal shown to one approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Green,
    Red,
}

/// Layout of the four-approach intersection on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionGeometry {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub road_width: f64,
    /// Distance from the intersection centre to each stop line.
    pub stop_line_offset: f64,
    /// Extra setback for vehicles travelling towards increasing coordinates.
    pub near_side_setback: f64,
    /// Extra setback for vehicles travelling towards decreasing coordinates.
    pub far_side_setback: f64,
    pub lane_center_shift: f64,
    /// Margin added around the road box to form the clearance zone.
    pub clearance_margin: f64,
    /// How far beyond the canvas edge new vehicles appear.
    pub spawn_distance: f64,
    /// Released vehicles are dropped once this far outside the canvas.
    pub exit_margin: f64,
    /// Spacing between consecutive queue slots.
    pub gap_size: f64,
    /// Minimum distance between the spawn point and the tail vehicle.
    pub safe_spawn_gap: f64,
}

impl Default for IntersectionGeometry {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            road_width: ROAD_WIDTH,
            stop_line_offset: STOP_LINE_OFFSET,
            near_side_setback: NEAR_SIDE_SETBACK,
            far_side_setback: FAR_SIDE_SETBACK,
            lane_center_shift: LANE_CENTER_SHIFT,
            clearance_margin: CLEARANCE_MARGIN,
            spawn_distance: SPAWN_DISTANCE,
            exit_margin: EXIT_MARGIN,
            gap_size: GAP_SIZE,
            safe_spawn_gap: SAFE_SPAWN_GAP,
        }
    }
}

impl IntersectionGeometry {
    pub fn center(&self) -> Position {
        Position::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }

    /// Box around the intersection that must hold no released vehicle before a phase starts.
    pub fn clearance_zone(&self) -> Zone {
        let c = self.center();
        let half = self.road_width / 2.0 + self.clearance_margin;
        Zone {
            min: Position::new(c.x - half, c.y - half),
            max: Position::new(c.x + half, c.y + half),
        }
    }

    /// Region inside which released vehicles are still simulated.
    pub fn exit_bounds(&self) -> Zone {
        Zone {
            min: Position::new(-self.exit_margin, -self.exit_margin),
            max: Position::new(
                self.canvas_width + self.exit_margin,
                self.canvas_height + self.exit_margin,
            ),
        }
    }

    /// Head-of-queue coordinate along the approach axis.
    pub fn stop_line(&self, direction: Direction) -> f64 {
        let centre = self.center().along(direction.axis());
        if direction.sign() > 0.0 {
            centre - self.stop_line_offset - self.near_side_setback
        } else {
            centre + self.stop_line_offset + self.far_side_setback
        }
    }

    /// Where new vehicles appear for an approach.
    pub fn spawn_point(&self, direction: Direction) -> Position {
        let axis = direction.axis();
        let extent = match axis {
            Axis::X => self.canvas_width,
            Axis::Y => self.canvas_height,
        };
        let along = if direction.sign() > 0.0 {
            -self.spawn_distance
        } else {
            extent + self.spawn_distance
        };

        let c = self.center();
        let lane_half = self.road_width / 4.0;
        match axis {
            Axis::Y => Position::new(
                c.x + direction.cross_side() * lane_half - self.lane_center_shift,
                along,
            ),
            Axis::X => Position::new(
                along,
                c.y + direction.cross_side() * lane_half - self.lane_center_shift,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_canvas_positions() {
        let g = IntersectionGeometry::default();
        assert_eq!(g.stop_line(Direction::Down), 135.0);
        assert_eq!(g.stop_line(Direction::Up), 405.0);
        assert_eq!(g.stop_line(Direction::Left), 505.0);
        assert_eq!(g.stop_line(Direction::Right), 235.0);

        assert_eq!(g.spawn_point(Direction::Down), Position::new(353.0, -100.0));
        assert_eq!(g.spawn_point(Direction::Up), Position::new(423.0, 700.0));
        assert_eq!(g.spawn_point(Direction::Left), Position::new(900.0, 253.0));
        assert_eq!(g.spawn_point(Direction::Right), Position::new(-100.0, 323.0));
    }

    #[test]
    fn clearance_zone_is_open_box_around_centre() {
        let zone = IntersectionGeometry::default().clearance_zone();
        assert!(zone.contains(Position::new(400.0, 300.0)));
        assert!(zone.contains(Position::new(291.0, 409.0)));
        assert!(!zone.contains(Position::new(290.0, 300.0)));
        assert!(!zone.contains(Position::new(400.0, 135.0)));
    }

    #[test]
    fn exit_bounds_extend_past_canvas() {
        let bounds = IntersectionGeometry::default().exit_bounds();
        assert!(bounds.contains(Position::new(-299.0, 899.0)));
        assert!(!bounds.contains(Position::new(1100.0, 300.0)));
    }
}
