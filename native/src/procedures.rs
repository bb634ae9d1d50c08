//! Typed calls into the helper procedures defined by the prelude.

use crate::decode::Value;
use crate::error::Result;
use crate::geometry::{Rectangle, WorldPoint};
use crate::query::Target;
use crate::session::Session;
use std::sync::Arc;

/// Remote name of the game client object.
pub const CLIENT: &str = "client";

pub struct Procedures {
    session: Arc<Session>,
}

impl Procedures {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// A chain builder rooted at the game client.
    pub fn client(&self) -> Target {
        Target::new(Arc::clone(&self.session), CLIENT)
    }

    /// Walkable path from the local player to `destination`, excluding the start.
    pub fn find_path(&self, destination: WorldPoint) -> Result<Vec<WorldPoint>> {
        let script = format!("findPath({}, {})", CLIENT, destination.constructor_expr());
        Ok(points_of(self.session.query(&script)?))
    }

    /// On-screen bounds of a tile, if it is visible.
    pub fn tile_clickbox(&self, tile: WorldPoint) -> Result<Option<Rectangle>> {
        let script = format!("getTileClickbox({}, {})", CLIENT, tile.constructor_expr());
        Ok(self.session.query(&script)?.and_then(|v| v.as_rectangle()))
    }

    /// Locations of every scene object with `id` on the current plane.
    pub fn find_tile_object(&self, id: i32) -> Result<Vec<WorldPoint>> {
        let script = format!("findTileObject({}, {})", CLIENT, id);
        Ok(points_of(self.session.query(&script)?))
    }

    pub fn local_player_location(&self) -> Result<Option<WorldPoint>> {
        let value = self
            .client()
            .call("getLocalPlayer", &[])
            .call("getWorldLocation", &[])
            .execute()?;
        Ok(value.and_then(|v| v.as_world_point()))
    }

    /// The client's current game state, e.g. `LOGGED_IN`. Numeric states
    /// render as the bare number.
    pub fn game_state(&self) -> Result<Option<String>> {
        let value = self.client().call("getGameState", &[]).execute()?;
        Ok(value.map(|v| v.to_string()))
    }
}

fn points_of(value: Option<Value>) -> Vec<WorldPoint> {
    value.map(|v| v.world_points()).unwrap_or_default()
}
