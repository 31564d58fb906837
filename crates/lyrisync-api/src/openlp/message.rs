// Presentation message parsing
//
// The live socket carries loosely-shaped JSON. Everything is reduced to
// the closed `LyricEvent` set here; anything unrecognized is `None`.

use serde_json::{Map, Value};
use tracing::trace;

use super::LyricEvent;

const BLANK_VERBS: [&str; 2] = ["blank", "clear"];
const BLANK_STATE_FLAGS: [&str; 3] = ["blank", "theme", "display"];

/// Translate one inbound frame into a lyric event.
///
/// Blank when any of:
/// - `type` or `action` is `blank`/`clear` (case-insensitive)
/// - `text` is null, empty or whitespace
/// - `results.blank`, `results.theme` or `results.display` is `true`
///
/// Otherwise a string `text` is a slide body. Non-JSON input, non-object
/// JSON and objects with none of these fields yield `None`.
pub fn parse_message(raw: &str) -> Option<LyricEvent> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            trace!(error = %e, "Ignoring non-JSON presentation frame");
            return None;
        }
    };
    let Value::Object(object) = value else {
        trace!("Ignoring non-object presentation frame");
        return None;
    };

    if has_blank_verb(&object) {
        return Some(LyricEvent::Blank);
    }

    match object.get("text") {
        Some(Value::String(text)) if text.trim().is_empty() => return Some(LyricEvent::Blank),
        Some(Value::String(text)) => return Some(LyricEvent::Text(text.clone())),
        Some(Value::Null) => return Some(LyricEvent::Blank),
        Some(_) => {
            trace!("Ignoring presentation frame with non-string text");
            return None;
        }
        None => {}
    }

    let live_state_blank = object
        .get("results")
        .and_then(Value::as_object)
        .is_some_and(|results| {
            BLANK_STATE_FLAGS
                .iter()
                .any(|flag| results.get(*flag).and_then(Value::as_bool) == Some(true))
        });

    live_state_blank.then_some(LyricEvent::Blank)
}

fn has_blank_verb(object: &Map<String, Value>) -> bool {
    ["type", "action"].iter().any(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|verb| BLANK_VERBS.iter().any(|b| verb.trim().eq_ignore_ascii_case(b)))
    })
}
