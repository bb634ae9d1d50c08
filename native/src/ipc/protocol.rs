// Text protocol spoken over the pipe:
//   client: READY    server: GO_AHEAD<END>
//   client: <script>; server: <value><END>

/// Readiness token sent before every payload.
pub const HANDSHAKE_READY: &str = "READY";

/// Token the server answers with once it accepts a payload.
pub const HANDSHAKE_GO_AHEAD: &str = "GO_AHEAD";

/// Marker the server appends to every reply.
pub const END_MARKER: &str = "<END>";

pub const STATEMENT_TERMINATOR: char = ';';

/// Append the statement terminator unless the script already ends with one.
pub fn normalize_script(script: &str) -> String {
    let mut payload = script.to_string();
    if !payload.ends_with(STATEMENT_TERMINATOR) {
        payload.push(STATEMENT_TERMINATOR);
    }
    payload
}

/// Remove one trailing end marker, if present.
pub fn strip_end_marker(reply: &str) -> &str {
    reply.strip_suffix(END_MARKER).unwrap_or(reply)
}

/// Decode reply bytes as UTF-8, replacing invalid sequences.
pub fn reply_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    strip_end_marker(&text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_terminator_once() {
        assert_eq!(normalize_script("client.getGameState()"), "client.getGameState();");
        assert_eq!(normalize_script("import java.util.*;"), "import java.util.*;");
        assert_eq!(normalize_script("a;;"), "a;;");
        assert_eq!(normalize_script(""), ";");
    }

    #[test]
    fn strips_single_end_marker() {
        assert_eq!(strip_end_marker("GO_AHEAD<END>"), "GO_AHEAD");
        assert_eq!(strip_end_marker("GO_AHEAD"), "GO_AHEAD");
        assert_eq!(strip_end_marker("x<END><END>"), "x<END>");
    }

    #[test]
    fn reply_text_is_lossy() {
        assert_eq!(reply_text(b"42<END>"), "42");
        assert_eq!(reply_text(&[0x66, 0xff, 0x6f]), "f\u{fffd}o");
    }
}
