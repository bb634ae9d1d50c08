//! Chained remote expressions built without knowing the chain shape up front.
//!
//! ```no_run
//! # use jshell_bridge::{query::Target, session::Session, config::BridgeConfig};
//! # fn demo() -> jshell_bridge::Result<()> {
//! let session = Session::builder(BridgeConfig::default()).build()?;
//! let mut client = Target::new(session, "client");
//! let location = client
//!     .field("getLocalPlayer")
//!     .call(&[])
//!     .field("getWorldLocation")
//!     .call(&[])
//!     .execute()?;
//! # let _ = location;
//! # Ok(())
//! # }
//! ```

use crate::decode::Value;
use crate::error::Result;
use crate::session::Session;
use log::debug;
use std::fmt::Display;
use std::sync::Arc;

/// Named remote object collecting committed chain segments.
pub struct Target {
    session: Arc<Session>,
    name: String,
    chain: Vec<String>,
}

/// A segment that is not committed until the chain moves past it.
///
/// Dropping a link without calling it or accessing past it adds nothing.
#[must_use = "an uncalled chain link contributes nothing to the expression"]
pub struct ChainLink<'t> {
    target: &'t mut Target,
    name: String,
}

impl Target {
    pub fn new(session: Arc<Session>, name: impl Into<String>) -> Self {
        Self {
            session,
            name: name.into(),
            chain: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Committed segments, oldest first.
    pub fn pending(&self) -> &[String] {
        &self.chain
    }

    /// Start a segment named `name`.
    pub fn field(&mut self, name: impl Into<String>) -> ChainLink<'_> {
        ChainLink {
            target: self,
            name: name.into(),
        }
    }

    /// Commit `name(args...)` directly.
    pub fn call(&mut self, name: impl Into<String>, args: &[&dyn Display]) -> &mut Self {
        self.field(name).call(args)
    }

    /// The expression the committed chain currently describes.
    pub fn expression(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.chain.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Build the expression, clear the chain and evaluate it remotely.
    pub fn execute(&mut self) -> Result<Option<Value>> {
        let expression = self.expression();
        self.chain.clear();
        let response = self.session.query(&expression);
        debug!("[QUERY] {} -> {:?}", expression, response);
        response
    }

    /// Replay textual segments; a trailing bare segment is dropped like an
    /// unused link.
    pub fn apply(&mut self, segments: &[Segment]) -> &mut Self {
        enum Cursor<'a> {
            Target(&'a mut Target),
            Link(ChainLink<'a>),
        }

        let mut cursor = Cursor::Target(self);
        for segment in segments {
            cursor = match (cursor, segment) {
                (Cursor::Target(t), Segment::Field(name)) => Cursor::Link(t.field(name.clone())),
                (Cursor::Link(link), Segment::Field(name)) => Cursor::Link(link.field(name.clone())),
                (Cursor::Target(t), Segment::Call { name, args }) => {
                    Cursor::Target(t.call(name.clone(), &display_args(args)))
                }
                (Cursor::Link(link), Segment::Call { name, args }) => {
                    Cursor::Target(link.field(name.clone()).call(&display_args(args)))
                }
            };
        }

        match cursor {
            Cursor::Target(t) => t,
            Cursor::Link(link) => link.target,
        }
    }

    fn commit(&mut self, segment: String) {
        self.chain.push(segment);
    }
}

impl<'t> ChainLink<'t> {
    /// Commit this segment as a bare attribute and start the next one.
    pub fn field(self, next: impl Into<String>) -> ChainLink<'t> {
        let target = self.target;
        target.commit(self.name);
        ChainLink {
            target,
            name: next.into(),
        }
    }

    /// Commit this segment as a call with positional arguments.
    pub fn call(self, args: &[&dyn Display]) -> &'t mut Target {
        let rendered = args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let target = self.target;
        target.commit(format!("{}({})", self.name, rendered));
        target
    }
}

/// One textual chain segment: `name` or `name(arg, ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Call { name: String, args: Vec<String> },
}

impl Segment {
    /// Parse `getWorldLocation`, `getItem()` or `findTileObject(client, 1276)`.
    /// Commas inside nested parentheses or quotes do not split arguments.
    pub fn parse(text: &str) -> Segment {
        let text = text.trim();
        let open = match text.find('(') {
            Some(open) if text.ends_with(')') => open,
            _ => return Segment::Field(text.to_string()),
        };

        let name = text[..open].trim().to_string();
        let inner = &text[open + 1..text.len() - 1];
        Segment::Call {
            name,
            args: split_args(inner),
        }
    }
}

fn split_args(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut current = String::new();

    for c in inner.chars() {
        match c {
            '"' => quoted = !quoted,
            '(' | '[' | '{' if !quoted => depth += 1,
            ')' | ']' | '}' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

fn display_args(args: &[String]) -> Vec<&dyn Display> {
    args.iter().map(|arg| arg as &dyn Display).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::geometry::WorldPoint;
    use crate::ipc::mock::MockServer;

    fn target(server: Arc<MockServer>, name: &str) -> Target {
        let config = BridgeConfig {
            pipe_name: "mock".to_string(),
            run_prelude: false,
            ..BridgeConfig::default()
        };
        let session = Session::builder(config)
            .connector(server)
            .build()
            .expect("session");
        Target::new(session, name)
    }

    #[test]
    fn chain_ending_in_call_materializes_exactly() {
        let server = Arc::new(MockServer::new(|_| {
            Some("WorldPoint(x=3222, y=3218, plane=0)<END>".to_string())
        }));
        let mut client = target(server.clone(), "client");

        let value = client
            .field("getLocalPlayer")
            .call(&[])
            .field("getWorldLocation")
            .call(&[])
            .execute()
            .expect("query");

        assert_eq!(
            server.payloads(),
            vec!["client.getLocalPlayer().getWorldLocation();"]
        );
        assert_eq!(value, Some(Value::WorldPoint(WorldPoint::new(3222, 3218, 0))));
        assert!(client.pending().is_empty());
    }

    #[test]
    fn bare_access_commits_when_chain_moves_on() {
        let server = Arc::new(MockServer::echo());
        let mut client = target(server, "client");

        client.field("getScene").field("getTiles").call(&[]);
        assert_eq!(client.expression(), "client.getScene.getTiles()");
    }

    #[test]
    fn trailing_bare_access_contributes_nothing() {
        let server = Arc::new(MockServer::echo());
        let mut client = target(server.clone(), "client");

        let _ = client.field("getLocalPlayer").call(&[]).field("getName");
        assert_eq!(client.expression(), "client.getLocalPlayer()");

        client.execute().expect("query");
        assert_eq!(server.payloads(), vec!["client.getLocalPlayer();"]);
    }

    #[test]
    fn arguments_render_with_display() {
        let server = Arc::new(MockServer::echo());
        let mut client = target(server, "client");

        let id = 1276;
        let tile = WorldPoint::new(1, 2, 0).constructor_expr();
        client
            .call("getItemDefinition", &[&id])
            .call("findTileObject", &[&"client", &tile]);
        assert_eq!(
            client.expression(),
            "client.getItemDefinition(1276).findTileObject(client, new WorldPoint(1, 2, 0))"
        );
    }

    #[test]
    fn execute_clears_chain_once() {
        let server = Arc::new(MockServer::echo());
        let mut client = target(server.clone(), "client");

        client.call("getPlane", &[]);
        client.execute().expect("first");
        client.call("getGameState", &[]);
        client.execute().expect("second");

        assert_eq!(
            server.payloads(),
            vec!["client.getPlane();", "client.getGameState();"]
        );
    }

    #[test]
    fn parses_segments() {
        assert_eq!(Segment::parse("getWorldLocation"), Segment::Field("getWorldLocation".into()));
        assert_eq!(
            Segment::parse("getLocalPlayer()"),
            Segment::Call {
                name: "getLocalPlayer".into(),
                args: vec![]
            }
        );
        assert_eq!(
            Segment::parse("getTileClickbox(client, new WorldPoint(1, 2, 0))"),
            Segment::Call {
                name: "getTileClickbox".into(),
                args: vec!["client".into(), "new WorldPoint(1, 2, 0)".into()]
            }
        );
        assert_eq!(
            Segment::parse(r#"getMethod("a, b")"#),
            Segment::Call {
                name: "getMethod".into(),
                args: vec![r#""a, b""#.into()]
            }
        );
    }

    #[test]
    fn apply_follows_lazy_commit_rules() {
        let server = Arc::new(MockServer::echo());
        let mut client = target(server, "client");

        let segments: Vec<Segment> = ["getScene", "getTiles()", "length"]
            .iter()
            .map(|s| Segment::parse(s))
            .collect();
        client.apply(&segments);
        assert_eq!(client.expression(), "client.getScene.getTiles()");
    }

    #[test]
    fn empty_chain_queries_target_itself() {
        let server = Arc::new(MockServer::echo());
        let mut client = target(server.clone(), "client");
        client.execute().expect("query");
        assert_eq!(server.payloads(), vec!["client;"]);
    }
}
