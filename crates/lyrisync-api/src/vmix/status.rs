// vMix XML state document
//
// Only the parts the sync engine reconciles against are extracted:
// the recording flag, per-channel overlay activity and the text fields
// of every input. Unknown elements are skipped.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::OverlayChannel;
use crate::error::Error;

/// One `<input>` entry of the state document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmixInput {
    pub key: String,
    pub number: String,
    pub title: String,
    pub short_title: String,
    /// `(name, value)` pairs from the input's `<text>` children.
    pub texts: Vec<(String, String)>,
}

impl VmixInput {
    /// vMix accepts an input reference by key, number, title or short title.
    pub fn matches(&self, reference: &str) -> bool {
        [&self.key, &self.number, &self.title, &self.short_title]
            .iter()
            .any(|candidate| !candidate.is_empty() && candidate.as_str() == reference)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// Parsed production state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmixStatus {
    pub version: Option<String>,
    pub recording: bool,
    /// Overlay activity for channels 1–4.
    pub overlays: [bool; 4],
    pub inputs: Vec<VmixInput>,
}

impl VmixStatus {
    pub fn overlay_active(&self, channel: OverlayChannel) -> bool {
        self.overlays
            .get(channel.index())
            .copied()
            .unwrap_or(false)
    }

    /// Current value of `field` on the input referenced by `input`.
    pub fn title_text(&self, input: &str, field: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|candidate| candidate.matches(input))
            .and_then(|candidate| candidate.text(field))
    }

    /// Parse the document returned by a bare GET on the API URL.
    pub fn from_xml(xml: &str) -> Result<Self, Error> {
        parse(xml).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: xml.chars().take(512).collect(),
        })
    }
}

// ── Event-driven parser ─────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("document root is not <vmix>")]
    NotVmix,
}

/// Element whose character content is currently being collected.
enum Capture {
    Version,
    Recording,
    Overlay(Option<usize>),
    Text(String),
}

fn parse(xml: &str) -> Result<VmixStatus, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut status = VmixStatus::default();
    let mut saw_root = false;
    let mut current_input: Option<VmixInput> = None;
    let mut capture: Option<(Capture, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = element.name();
                match name.as_ref() {
                    b"vmix" => saw_root = true,
                    b"input" => current_input = Some(input_from(&element)?),
                    b"version" => capture = Some((Capture::Version, String::new())),
                    b"recording" => capture = Some((Capture::Recording, String::new())),
                    b"overlay" => {
                        capture = Some((Capture::Overlay(overlay_index(&element)?), String::new()));
                    }
                    b"text" if current_input.is_some() => {
                        let field = attribute(&element, b"name")?.unwrap_or_default();
                        capture = Some((Capture::Text(field), String::new()));
                    }
                    _ => {}
                }
            }
            Event::Empty(element) => {
                let name = element.name();
                match name.as_ref() {
                    b"vmix" => saw_root = true,
                    b"input" => status.inputs.push(input_from(&element)?),
                    b"text" => {
                        if let Some(input) = current_input.as_mut() {
                            let field = attribute(&element, b"name")?.unwrap_or_default();
                            input.texts.push((field, String::new()));
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = capture.as_mut() {
                    buffer.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some((_, buffer)) = capture.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(element) => {
                let name = element.name();
                if name.as_ref() == b"input" {
                    if let Some(input) = current_input.take() {
                        status.inputs.push(input);
                    }
                } else if let Some((kind, value)) = capture.take() {
                    apply_capture(&mut status, current_input.as_mut(), kind, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if saw_root {
        Ok(status)
    } else {
        Err(ParseError::NotVmix)
    }
}

fn apply_capture(
    status: &mut VmixStatus,
    input: Option<&mut VmixInput>,
    kind: Capture,
    value: String,
) {
    match kind {
        Capture::Version => status.version = Some(value.trim().to_owned()),
        Capture::Recording => status.recording = value.trim().eq_ignore_ascii_case("true"),
        Capture::Overlay(Some(index)) => {
            if let Some(slot) = status.overlays.get_mut(index) {
                *slot = !value.trim().is_empty();
            }
        }
        Capture::Overlay(None) => {}
        Capture::Text(field) => {
            if let Some(input) = input {
                input.texts.push((field, value));
            }
        }
    }
}

fn input_from(element: &BytesStart<'_>) -> Result<VmixInput, quick_xml::Error> {
    Ok(VmixInput {
        key: attribute(element, b"key")?.unwrap_or_default(),
        number: attribute(element, b"number")?.unwrap_or_default(),
        title: attribute(element, b"title")?.unwrap_or_default(),
        short_title: attribute(element, b"shortTitle")?.unwrap_or_default(),
        texts: Vec::new(),
    })
}

/// `<overlay number="n">` maps to index `n - 1`; numbers outside 1–4 are ignored.
fn overlay_index(element: &BytesStart<'_>) -> Result<Option<usize>, quick_xml::Error> {
    Ok(attribute(element, b"number")?
        .and_then(|n| n.trim().parse::<u8>().ok())
        .and_then(|n| OverlayChannel::new(n).ok())
        .map(OverlayChannel::index))
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            let value: Cow<'_, str> = attr.unescape_value()?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
