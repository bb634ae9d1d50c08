//! Statements sent once when a session starts: type imports followed by the
//! helper procedures that `procedures` calls into.

/// Imports, in the order the remote interpreter receives them.
pub const IMPORTS: &[&str] = &[
    "import java.awt.Rectangle;",
    "import java.awt.Point;",
    "import java.awt.Polygon;",
    "import java.awt.Canvas;",
    "import net.runelite.api.coords.LocalPoint;",
    "import net.runelite.api.Perspective;",
    "import net.runelite.api.coords.WorldPoint;",
    "import net.runelite.api.Client;",
    "import net.runelite.api.Scene;",
    "import net.runelite.api.Tile;",
    "import net.runelite.api.coords.*;",
    "import net.runelite.api.*;",
    "import java.lang.reflect.*;",
    "import net.runelite.api.TileObject;",
    "import net.runelite.api.GameObject;",
    "import net.runelite.api.WallObject;",
    "import net.runelite.api.DecorativeObject;",
    "import net.runelite.api.GroundObject;",
    "import java.util.*;",
    "import java.util.stream.Collectors;",
    "import java.util.stream.Stream;",
    "import net.runelite.api.InventoryID;",
    "import net.runelite.api.ItemContainer;",
    "import net.runelite.api.Item;",
    "import net.runelite.api.widgets.WidgetInfo;",
    "import net.runelite.api.widgets.Widget;",
    "import java.lang.Exception;",
    "import java.util.List;",
    "import java.util.ArrayList;",
    "import java.util.HashSet;",
    "import java.util.ArrayDeque;",
    "import java.util.Collections;",
];

/// Linked path node used by `findPath`.
pub const NODE_CLASS: &str = r#"
public class Node {
    WorldPoint data;
    Node previous;

    Node(WorldPoint data) {
        this.data = data;
    }

    Node() {
        this.data = null;
        this.previous = null;
    }

    Node(WorldPoint data, Node previous) {
        this.data = data;
        this.previous = previous;
    }

    public WorldPoint getData() {
        return data;
    }

    public Node getPrevious() {
        return previous;
    }

    public void setNode(WorldPoint data, Node previous) {
        this.data = data;
        this.previous = previous;
    }
}
"#;

/// Breadth-first walk from the local player to a destination tile.
pub const FIND_PATH: &str = r#"
public static List<WorldPoint> findPath(Client client, WorldPoint p) {
    long start = System.currentTimeMillis();
    WorldPoint starting = client.getLocalPlayer().getWorldLocation();
    HashSet<WorldPoint> visited = new HashSet<>();
    ArrayDeque<Node> queue = new ArrayDeque<Node>();
    queue.add(new Node(starting));
    while (!queue.isEmpty()) {
        Node current = queue.poll();
        WorldPoint currentData = current.getData();
        if (currentData.equals(p)) {
            List<WorldPoint> ret = new ArrayList<>();
            while (current != null) {
                ret.add(current.getData());
                current = current.getPrevious();
            }
            Collections.reverse(ret);
            ret.remove(0);
            System.out.println("Path took " + (System.currentTimeMillis() - start) + "ms");
            return ret;
        }
        //west
        if (west(currentData) && visited.add(currentData.dx(-1))) {
            queue.add(new Node(currentData.dx(-1), current));
        }
        //east
        if (east(currentData) && visited.add(currentData.dx(1))) {
            queue.add(new Node(currentData.dx(1), current));
        }
        //south
        if (south(currentData) && visited.add(currentData.dy(-1))) {
            queue.add(new Node(currentData.dy(-1), current));
        }
        //north
        if (north(currentData) && visited.add(currentData.dy(1))) {
            queue.add(new Node(currentData.dy(1), current));
        }
    }
    return null;
}
"#;

/// Canvas bounds of a tile's polygon, or `null` when off-screen.
pub const TILE_CLICKBOX: &str = r#"
public static Rectangle getTileClickbox(Client client, WorldPoint tile) {
    LocalPoint lp = LocalPoint.fromWorld(client, tile);
    Polygon p = null;
    try {
       p = Perspective.getCanvasTilePoly(client, lp);
    }
    catch (Exception e) {
        return null;
    }

    if (p == null) {
        return null;
    }
    if (p.npoints == 0) {
        return null;
    }

    return p.getBounds();
}
"#;

/// World locations of every scene object with the given id, or `"null"`.
pub const FIND_TILE_OBJECT: &str = r#"
public static String findTileObject(Client client, int id) {
    Scene scene = client.getScene();
    Tile[][][] tiles = scene.getTiles();
    Tile[][] tile = tiles[client.getPlane()];
    List foundLocations = new ArrayList<WorldPoint>();
    for (int i=0; i < tile.length; i++) {
        for (int j=0; j < tile[i].length; j++) {
                if (tile[i][j] != null) {
                    for (GameObject gameObject : tile[i][j].getGameObjects()) {
                        if (gameObject != null && gameObject.getId() == id) {
                            foundLocations.add(gameObject.getWorldLocation());
                        }
                    }

                    WallObject wallObject = tile[i][j].getWallObject();
                    if (wallObject != null && wallObject.getId() == id) {
                        foundLocations.add(wallObject.getWorldLocation());
                    }

                    DecorativeObject decorativeObject = tile[i][j].getDecorativeObject();
                    if (decorativeObject != null && decorativeObject.getId() == id) {
                        foundLocations.add(decorativeObject.getWorldLocation());
                    }

                    GroundObject groundObject = tile[i][j].getGroundObject();
                    if (groundObject != null && groundObject.getId() == id) {
                        foundLocations.add(groundObject.getWorldLocation());
                    }
                }
            }
        }
    if (foundLocations.size() > 0) {
        return foundLocations.toString();
    }
    else {
        return "null";
    }
}
"#;

pub const PROCEDURES: &[&str] = &[NODE_CLASS, FIND_PATH, TILE_CLICKBOX, FIND_TILE_OBJECT];

/// Every start-up statement in transmission order.
pub fn statements() -> impl Iterator<Item = &'static str> {
    IMPORTS.iter().chain(PROCEDURES.iter()).copied()
}
