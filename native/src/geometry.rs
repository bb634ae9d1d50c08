// Plain coordinate types returned by decoded responses.
use serde::{Deserialize, Serialize};

/// Tile coordinate in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl WorldPoint {
    pub const fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// Remote-side expression constructing this point.
    pub fn constructor_expr(&self) -> String {
        format!("new WorldPoint({}, {}, {})", self.x, self.y, self.plane)
    }
}

/// Axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Centre point, clamped to the `i32` range near the edges.
    pub fn center(&self) -> Point {
        Point::new(
            midpoint(self.x, self.width),
            midpoint(self.y, self.height),
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        let (px, py) = (i64::from(point.x), i64::from(point.y));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        px >= x
            && py >= y
            && px < x + i64::from(self.width)
            && py < y + i64::from(self.height)
    }
}

fn midpoint(origin: i32, extent: i32) -> i32 {
    let mid = i64::from(origin) + i64::from(extent) / 2;
    mid.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
