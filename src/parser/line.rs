//! Line parser: one raw line in, at most one event out.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Captures;

use super::event::{Event, MissionOutcome, TransactionKind};
use super::patterns::{LinePattern, PatternKind, PatternTable, QuantityUnit};
use crate::watcher::RawLine;

/// Stateless parser over a fixed pattern table.
#[derive(Debug, Clone)]
pub struct LineParser {
    table: PatternTable,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(PatternTable::with_default_patterns())
    }
}

impl LineParser {
    #[must_use]
    pub fn new(table: PatternTable) -> Self {
        Self { table }
    }

    /// Parse a raw line read from the log.
    #[must_use]
    pub fn parse(&self, line: &RawLine) -> Option<Event> {
        self.parse_text(&line.text)
    }

    /// Parse a line of text.
    ///
    /// Unrecognized lines and lines whose fields fail validation yield
    /// `None`; this never fails.
    #[must_use]
    pub fn parse_text(&self, text: &str) -> Option<Event> {
        let text = text.trim_end();
        if text.is_empty() {
            return None;
        }
        let (pattern, caps) = self.table.find(text)?;
        let event = build_event(pattern, &caps, parse_timestamp(text));
        if event.is_none() {
            tracing::trace!(marker = pattern.marker(), line = %text, "Skipping line with invalid fields");
        }
        event
    }
}

/// Parse the `<2024-05-01T12:00:00.123Z>` prefix of a line.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let rest = text.trim_start().strip_prefix('<')?;
    let inner = &rest[..rest.find('>')?];
    if let Ok(ts) = DateTime::parse_from_rfc3339(inner) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(inner, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn field<'a>(caps: &'a Captures<'_>, name: &str) -> Option<&'a str> {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn owned(caps: &Captures<'_>, name: &str) -> Option<String> {
    field(caps, name).map(str::to_string)
}

fn parse_price(caps: &Captures<'_>) -> Option<f64> {
    field(caps, "price")?
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_quantity(caps: &Captures<'_>, unit: QuantityUnit) -> Option<i64> {
    let raw = field(caps, "quantity")?;
    match unit {
        QuantityUnit::Units => raw.parse::<u32>().ok().map(i64::from),
        QuantityUnit::Cscu => {
            let cscu = raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)?;
            if cscu >= 100.0 {
                Some((cscu / 100.0).floor().min(f64::from(u32::MAX)) as i64)
            } else {
                Some(1)
            }
        }
    }
}

fn build_event(
    pattern: &LinePattern,
    caps: &Captures<'_>,
    timestamp: Option<DateTime<Utc>>,
) -> Option<Event> {
    match pattern.kind() {
        PatternKind::SessionStarted => {
            let player = owned(caps, "player")?;
            let player_id = owned(caps, "player_id");
            let session_id = owned(caps, "session")
                .or_else(|| player_id.clone())
                .unwrap_or_else(|| player.clone());
            Some(Event::SessionStarted {
                player,
                player_id,
                session_id,
                map: owned(caps, "map"),
                game_version: owned(caps, "version"),
                timestamp,
            })
        }
        PatternKind::SessionEnded => {
            let uptime_secs = match field(caps, "uptime") {
                Some(raw) => Some(raw.parse::<f64>().ok().filter(|v| v.is_finite())?),
                None => None,
            };
            Some(Event::SessionEnded {
                uptime_secs,
                timestamp,
            })
        }
        PatternKind::Version => Some(Event::VersionDetected {
            version: owned(caps, "version")?,
            timestamp,
        }),
        PatternKind::Branch => Some(Event::BranchDetected {
            branch: owned(caps, "branch")?,
            timestamp,
        }),
        PatternKind::Purchase | PatternKind::Sale => {
            let kind = if pattern.kind() == PatternKind::Purchase {
                TransactionKind::Purchase
            } else {
                TransactionKind::Sale
            };
            let item_id = match owned(caps, "item") {
                Some(item) => item,
                None => {
                    let resource = field(caps, "resource")?;
                    format!("Commodity-{}", resource.chars().take(8).collect::<String>())
                }
            };
            let quantity = parse_quantity(caps, pattern.unit())?;
            Some(Event::InventoryTransaction {
                item_id,
                quantity: quantity * kind.sign(),
                container_id: owned(caps, "shop")?,
                price: parse_price(caps)?,
                kind,
                timestamp,
            })
        }
        PatternKind::MissionEnded => Some(Event::MissionEnded {
            mission_id: owned(caps, "mission")?,
            player: owned(caps, "player")?,
            outcome: MissionOutcome::from_completion_type(field(caps, "completion")?),
            reason: owned(caps, "reason")?,
            timestamp,
        }),
    }
}
