use quick_xml::Reader;
use quick_xml::events::Event;

use crate::domain::{AppId, GameRecord};
use crate::error::AppManifestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AppId,
    Name,
    Error,
}

/// Parse a `games?tab=all&xml=1` document into records.
///
/// Only direct `<appID>` and `<name>` children of a `<game>` element are read,
/// and a game is kept only when both are present and non-blank. Steam answers
/// unknown or private profiles with `<response><error>..</error></response>`,
/// which is reported as [`AppManifestError::ProfileUnavailable`].
pub fn parse_games_xml(xml: &str) -> Result<Vec<GameRecord>, AppManifestError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut saw_root = false;
    let mut root_closed = false;
    let mut root_is_response = false;
    let mut game_depth: Option<usize> = None;
    let mut field: Option<(Field, usize)> = None;

    let mut app_id = String::new();
    let mut name = String::new();
    let mut error_text = String::new();
    let mut games = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(err) => {
                return Err(AppManifestError::Parse(format!(
                    "{err} (at byte {})",
                    reader.buffer_position()
                )));
            }
        };

        match event {
            Event::Start(e) => {
                if depth == 0 && root_closed {
                    return Err(junk_after_root(&reader));
                }
                depth += 1;
                let local = e.local_name();
                if depth == 1 {
                    saw_root = true;
                    root_is_response = local.as_ref() == b"response";
                }
                match (game_depth, local.as_ref()) {
                    (None, b"game") => {
                        game_depth = Some(depth);
                        app_id.clear();
                        name.clear();
                    }
                    (Some(game), b"appID") if depth == game + 1 => {
                        field = Some((Field::AppId, depth));
                    }
                    (Some(game), b"name") if depth == game + 1 => {
                        field = Some((Field::Name, depth));
                    }
                    (None, b"error") if root_is_response && depth == 2 => {
                        field = Some((Field::Error, depth));
                    }
                    _ => {}
                }
            }
            Event::Empty(_) => {
                if depth == 0 {
                    if root_closed {
                        return Err(junk_after_root(&reader));
                    }
                    saw_root = true;
                    root_closed = true;
                }
            }
            Event::Text(e) => {
                if depth == 0 && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(AppManifestError::Parse(format!(
                        "text outside the root element (at byte {})",
                        reader.buffer_position()
                    )));
                }
                if let Some((kind, at)) = field {
                    if at == depth {
                        let text = e
                            .unescape()
                            .map_err(|err| AppManifestError::Parse(err.to_string()))?;
                        push_text(kind, &text, &mut app_id, &mut name, &mut error_text);
                    }
                }
            }
            Event::CData(e) => {
                if depth == 0 {
                    return Err(AppManifestError::Parse(format!(
                        "text outside the root element (at byte {})",
                        reader.buffer_position()
                    )));
                }
                if let Some((kind, at)) = field {
                    if at == depth {
                        let raw = e.into_inner();
                        let text = String::from_utf8_lossy(&raw);
                        push_text(kind, &text, &mut app_id, &mut name, &mut error_text);
                    }
                }
            }
            Event::End(_) => {
                if let Some((_, at)) = field {
                    if at == depth {
                        field = None;
                    }
                }
                if game_depth == Some(depth) {
                    game_depth = None;
                    if let Some(record) = finish_game(&app_id, &name) {
                        games.push(record);
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(AppManifestError::Parse(format!(
                        "unexpected end of document with {depth} unclosed element(s)"
                    )));
                }
                if !saw_root {
                    return Err(AppManifestError::Parse(
                        "document has no root element".to_string(),
                    ));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    let error_text = error_text.trim();
    if games.is_empty() && !error_text.is_empty() {
        return Err(AppManifestError::ProfileUnavailable(error_text.to_string()));
    }

    Ok(games)
}

fn push_text(kind: Field, text: &str, app_id: &mut String, name: &mut String, error: &mut String) {
    match kind {
        Field::AppId => app_id.push_str(text),
        Field::Name => name.push_str(text),
        Field::Error => error.push_str(text),
    }
}

fn junk_after_root(reader: &Reader<&[u8]>) -> AppManifestError {
    AppManifestError::Parse(format!(
        "junk after document element (at byte {})",
        reader.buffer_position()
    ))
}

// The id is trimmed by `AppId`; the name is kept as sent.
fn finish_game(app_id: &str, name: &str) -> Option<GameRecord> {
    if name.trim().is_empty() {
        return None;
    }
    let app_id: AppId = app_id.parse().ok()?;
    Some(GameRecord::new(app_id, name))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn reads_cdata_names() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<gamesList>
  <steamID64>76561197960287930</steamID64>
  <games>
    <game>
      <appID>620</appID>
      <name><![CDATA[Portal 2]]></name>
      <hoursOnRecord>12.5</hoursOnRecord>
    </game>
  </games>
</gamesList>"#;
        let games = parse_games_xml(xml).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].app_id.as_str(), "620");
        assert_eq!(games[0].name, "Portal 2");
    }

    #[test]
    fn unescapes_plain_text_names() {
        let xml = "<gamesList><games><game><appID>1</appID><name>Salt &amp; Sanctuary</name></game></games></gamesList>";
        let games = parse_games_xml(xml).unwrap();
        assert_eq!(games[0].name, "Salt & Sanctuary");
    }

    #[test]
    fn ignores_nested_name_elements() {
        let xml = "<gamesList><game><appID>5</appID><stats><name>nope</name></stats></game></gamesList>";
        let games = parse_games_xml(xml).unwrap();
        assert!(games.is_empty());
    }

    #[test]
    fn error_response_is_profile_unavailable() {
        let xml = "<response><error><![CDATA[The specified profile could not be found.]]></error></response>";
        let err = parse_games_xml(xml).unwrap_err();
        assert_matches!(err, AppManifestError::ProfileUnavailable(msg) if msg.contains("could not be found"));
    }

    #[test]
    fn unclosed_document_is_parse_error() {
        let err = parse_games_xml("<gamesList><games><game>").unwrap_err();
        assert_matches!(err, AppManifestError::Parse(_));
    }

    #[test]
    fn content_after_root_is_parse_error() {
        for xml in [
            "<gamesList><game><appID>1</appID><name>A</name></game></gamesList><gamesList/>",
            "<gamesList><game><appID>1</appID><name>A</name></game></gamesList>trailing junk",
            "<gamesList/><other></other>",
            "<gamesList></gamesList><![CDATA[x]]>",
        ] {
            let err = parse_games_xml(xml).unwrap_err();
            assert_matches!(err, AppManifestError::Parse(msg) if msg.contains("at byte"), "xml {xml:?}");
        }
    }

    #[test]
    fn trailing_whitespace_after_root_is_fine() {
        let xml = "<gamesList><game><appID>1</appID><name>A</name></game></gamesList>\n\n";
        assert_eq!(parse_games_xml(xml).unwrap().len(), 1);
    }

    #[test]
    fn name_is_kept_as_sent() {
        let xml = "<gamesList><game><appID> 7 </appID><name><![CDATA[  Spaced Out ]]></name></game></gamesList>";
        let games = parse_games_xml(xml).unwrap();
        assert_eq!(games[0].app_id.as_str(), "7");
        assert_eq!(games[0].name, "  Spaced Out ");
    }

    #[test]
    fn blank_name_is_skipped() {
        let xml = "<gamesList><game><appID>7</appID><name>   </name></game></gamesList>";
        assert!(parse_games_xml(xml).unwrap().is_empty());
    }

    #[test]
    fn empty_root_is_an_empty_list() {
        assert!(parse_games_xml("<gamesList/>").unwrap().is_empty());
    }
}
