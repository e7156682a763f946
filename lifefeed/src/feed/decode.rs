use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::core::error::DecodeError;

/// What a decoder extracts from one response body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedWorld {
    pub sequence: u64,
    pub is_over: bool,
    pub payload: String,
}

pub trait FrameDecoder: Send + Sync {
    fn decode(&self, body: &str) -> Result<DecodedWorld, DecodeError>;
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    #[default]
    Html,
    Json,
}

impl FeedFormat {
    pub fn decoder(self) -> Box<dyn FrameDecoder> {
        match self {
            FeedFormat::Html => Box::new(HtmlDecoder),
            FeedFormat::Json => Box::new(JsonDecoder),
        }
    }
}

impl FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(FeedFormat::Html),
            "json" => Ok(FeedFormat::Json),
            other => Err(format!("unknown feed format '{}'", other)),
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFormat::Html => write!(f, "html"),
            FeedFormat::Json => write!(f, "json"),
        }
    }
}

/// State of a cell relative to the previous generation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CellState {
    Empty,
    /// Born in this generation.
    Living,
    /// Died in this generation.
    Dead,
    Surviving,
}

impl CellState {
    pub fn from_digit(c: char) -> Result<Self, DecodeError> {
        match c {
            '0' => Ok(CellState::Empty),
            '1' => Ok(CellState::Living),
            '2' => Ok(CellState::Dead),
            '3' => Ok(CellState::Surviving),
            other => Err(DecodeError::CellState(other)),
        }
    }

    pub fn glyph(self) -> char {
        match self {
            CellState::Empty => ' ',
            CellState::Living => 'o',
            CellState::Dead => '.',
            CellState::Surviving => 'O',
        }
    }
}

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

fn counter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            concat!(
                r#"(?is)<[^>]*\bid\s*=\s*["']hiddenCounter["'][^>]*>"#,
                r"([^<]*)</[^>]*>",
            ),
            "hidden counter",
        )
    })
}

fn game_over_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r#"(?i)\bid\s*=\s*["']gameOver["']"#, "game over marker")
    })
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(
            r"(?i)<br\s*/?>|</(p|div|tr|li|h[1-6]|table)\s*>",
            "line break",
        )
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r"(?s)<[^>]*>", "tag"))
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);", "entity")
    })
}

/// Decodes the page fragment served by the Flask front end.
///
/// The generation number is the text of the `hiddenCounter` element and the
/// simulation is over once a `gameOver` element shows up. The payload is the
/// fragment flattened to text lines, without the hidden counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlDecoder;

impl FrameDecoder for HtmlDecoder {
    fn decode(&self, body: &str) -> Result<DecodedWorld, DecodeError> {
        let captures = counter_re()
            .captures(body)
            .ok_or(DecodeError::MissingCounter)?;
        let counter = captures[1].trim();
        let sequence = counter
            .parse::<u64>()
            .map_err(|_| DecodeError::InvalidCounter(counter.to_string()))?;

        let is_over = game_over_re().is_match(body);
        let visible = counter_re().replace_all(body, "");

        Ok(DecodedWorld {
            sequence,
            is_over,
            payload: html_to_text(&visible),
        })
    }
}

fn html_to_text(markup: &str) -> String {
    let with_breaks = line_break_re().replace_all(markup, "\n");
    let stripped = tag_re().replace_all(&with_breaks, "");

    let decoded = entity_re().replace_all(&stripped, |caps: &Captures| {
        match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });

    decoded
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numeric references and the few named ones the server emits. Anything
/// else is left as written.
fn decode_entity(name: &str) -> Option<char> {
    let code = if let Some(hex) =
        name.strip_prefix("#x").or_else(|| name.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(decimal) = name.strip_prefix('#') {
        decimal.parse::<u32>().ok()?
    } else {
        return match name {
            "nbsp" => Some(' '),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "amp" => Some('&'),
            _ => None,
        };
    };

    char::from_u32(code)
}

#[derive(Debug, Deserialize)]
struct WorldDocument {
    serial: u64,
    #[serde(default)]
    is_over: bool,
    width: usize,
    height: usize,
    cells: Vec<String>,
}

/// Decodes `{"serial", "is_over", "width", "height", "cells"}` documents
/// where every row of `cells` is a string of cell-state digits.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

impl FrameDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> Result<DecodedWorld, DecodeError> {
        let doc: WorldDocument = serde_json::from_str(body)
            .map_err(|err| DecodeError::Malformed(err.to_string()))?;

        if doc.cells.len() != doc.height {
            return Err(DecodeError::RowCount {
                expected: doc.height,
                found: doc.cells.len(),
            });
        }

        let mut rows = Vec::with_capacity(doc.height);

        for (index, row) in doc.cells.iter().enumerate() {
            let found = row.chars().count();
            if found != doc.width {
                return Err(DecodeError::RowWidth {
                    width: doc.width,
                    height: doc.height,
                    row: index,
                    found,
                });
            }

            let line = row
                .chars()
                .map(|c| CellState::from_digit(c).map(CellState::glyph))
                .collect::<Result<String, _>>()?;
            rows.push(line);
        }

        Ok(DecodedWorld {
            sequence: doc.serial,
            is_over: doc.is_over,
            payload: rows.join("\n"),
        })
    }
}
