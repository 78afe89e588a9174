//! Line pattern table.
//!
//! Each pattern pairs a literal marker, which must appear in the line, with
//! a regex whose named capture groups supply the event fields. The table is
//! ordered by marker length so the most specific shape is tried first.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Kind of event a pattern produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    SessionStarted,
    SessionEnded,
    Version,
    Branch,
    Purchase,
    Sale,
    MissionEnded,
}

impl PatternKind {
    /// Capture groups the regex must declare.
    #[must_use]
    pub fn required_groups(self) -> &'static [&'static str] {
        match self {
            Self::SessionStarted => &["player"],
            Self::SessionEnded => &[],
            Self::Version => &["version"],
            Self::Branch => &["branch"],
            Self::Purchase | Self::Sale => &["shop", "price", "quantity"],
            Self::MissionEnded => &["mission", "player", "completion", "reason"],
        }
    }
}

/// Unit of the `quantity` capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    /// Whole items.
    #[default]
    Units,
    /// Centi-SCU cargo volume; 100 cSCU make one unit, minimum one.
    Cscu,
}

/// Pattern declaration as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub marker: String,
    pub regex: String,
    #[serde(default)]
    pub unit: QuantityUnit,
}

/// Error type for pattern construction.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern.
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Regex lacks a capture group the kind needs.
    #[error("Pattern for {kind:?} is missing capture group `{group}`")]
    MissingGroup {
        kind: PatternKind,
        group: &'static str,
    },

    /// Marker is empty.
    #[error("Pattern for {0:?} has an empty marker")]
    EmptyMarker(PatternKind),
}

/// A compiled line pattern.
#[derive(Debug, Clone)]
pub struct LinePattern {
    kind: PatternKind,
    marker: String,
    regex: Regex,
    unit: QuantityUnit,
}

impl LinePattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex is invalid, the marker is empty, or a
    /// capture group required by `kind` is missing.
    pub fn new(
        kind: PatternKind,
        marker: impl Into<String>,
        regex: &str,
        unit: QuantityUnit,
    ) -> Result<Self, PatternError> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(PatternError::EmptyMarker(kind));
        }
        let regex = Regex::new(regex)?;

        let has_group = |name: &str| regex.capture_names().flatten().any(|n| n == name);
        for &group in kind.required_groups() {
            if !has_group(group) {
                return Err(PatternError::MissingGroup { kind, group });
            }
        }
        if matches!(kind, PatternKind::Purchase | PatternKind::Sale)
            && !has_group("item")
            && !has_group("resource")
        {
            return Err(PatternError::MissingGroup {
                kind,
                group: "item or resource",
            });
        }

        Ok(Self {
            kind,
            marker,
            regex,
            unit,
        })
    }

    /// Compile a pattern from its configuration form.
    ///
    /// # Errors
    ///
    /// See [`LinePattern::new`].
    pub fn from_spec(spec: &PatternSpec) -> Result<Self, PatternError> {
        Self::new(spec.kind, spec.marker.clone(), &spec.regex, spec.unit)
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    #[must_use]
    pub fn unit(&self) -> QuantityUnit {
        self.unit
    }

    /// Captures for `line` if the marker is present and the regex matches.
    #[must_use]
    pub fn captures<'t>(&self, line: &'t str) -> Option<Captures<'t>> {
        if !line.contains(self.marker.as_str()) {
            return None;
        }
        self.regex.captures(line)
    }
}

/// Ordered collection of line patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    patterns: Vec<LinePattern>,
}

impl PatternTable {
    /// Build a table, ordering patterns by marker length (longest first).
    ///
    /// Patterns with equal marker length keep their relative order.
    #[must_use]
    pub fn new(mut patterns: Vec<LinePattern>) -> Self {
        patterns.sort_by(|a, b| b.marker.len().cmp(&a.marker.len()));
        Self { patterns }
    }

    /// Create a table with the built-in `Game.log` patterns.
    #[must_use]
    pub fn with_default_patterns() -> Self {
        let patterns = default_patterns()
            .iter()
            .filter_map(|spec| match LinePattern::from_spec(spec) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(marker = %spec.marker, error = %e, "Failed to compile default pattern");
                    None
                }
            })
            .collect();
        Self::new(patterns)
    }

    /// Built-in patterns extended with configured ones.
    ///
    /// # Errors
    ///
    /// Returns the first error among the configured patterns.
    pub fn with_extra(specs: &[PatternSpec]) -> Result<Self, PatternError> {
        let mut patterns = Self::with_default_patterns().patterns;
        for spec in specs {
            patterns.push(LinePattern::from_spec(spec)?);
        }
        Ok(Self::new(patterns))
    }

    /// Get all patterns in match order.
    #[must_use]
    pub fn patterns(&self) -> &[LinePattern] {
        &self.patterns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// First pattern whose marker and regex both match `line`.
    #[must_use]
    pub fn find<'t>(&self, line: &'t str) -> Option<(&LinePattern, Captures<'t>)> {
        self.patterns
            .iter()
            .find_map(|p| p.captures(line).map(|caps| (p, caps)))
    }
}

const SHOP_FIELDS: &str = r"shopName\[(?P<shop>[^\]]+)\].*?client_price\[(?P<price>[\d.]+)\].*?itemName\[(?P<item>[^\]]+)\].*?quantity\[(?P<quantity>\d+)\]";

fn spec(kind: PatternKind, marker: &str, regex: &str, unit: QuantityUnit) -> PatternSpec {
    PatternSpec {
        kind,
        marker: marker.to_string(),
        regex: regex.to_string(),
        unit,
    }
}

/// Star Citizen `Game.log` line shapes.
fn default_patterns() -> Vec<PatternSpec> {
    use PatternKind::{Branch, MissionEnded, Purchase, Sale, SessionEnded, SessionStarted, Version};
    use QuantityUnit::{Cscu, Units};

    vec![
        spec(
            SessionStarted,
            "<Channel Created>",
            r#"map="(?P<map>[^"]*)".*?nickname="(?P<player>[^"]+)".*?playerGEID=(?P<player_id>\d+)(?:.*?\bsessionId=(?P<session>[\w-]+))?"#,
            Units,
        ),
        spec(
            SessionEnded,
            "<Channel Disconnected>",
            r"^(?:.*?uptime_secs=(?P<uptime>[\d.]+))?",
            Units,
        ),
        spec(Version, "ProductVersion:", r"ProductVersion:\s+(?P<version>[\d.]+)", Units),
        spec(Branch, "Branch:", r"Branch:\s+(?P<branch>[\w.-]+)", Units),
        spec(
            Purchase,
            "<CEntityComponentShopUIProvider::SendShopBuyRequest>",
            SHOP_FIELDS,
            Units,
        ),
        spec(
            Sale,
            "<CEntityComponentShopUIProvider::SendShopSellRequest>",
            SHOP_FIELDS,
            Units,
        ),
        spec(
            Purchase,
            "<CEntityComponentShoppingProvider::SendStandardItemBuyRequest>",
            SHOP_FIELDS,
            Units,
        ),
        spec(
            Sale,
            "<CEntityComponentShoppingProvider::SendStandardItemSellRequest>",
            SHOP_FIELDS,
            Units,
        ),
        spec(
            Purchase,
            "<CEntityComponentCommodityUIProvider::SendCommodityBuyRequest>",
            r"shopName\[(?P<shop>[^\]]+)\].*?price\[(?P<price>[\d.]+)\].*?resourceGUID\[(?P<resource>[^\]]+)\].*?quantity\[(?P<quantity>[\d.]+) cSCU\]",
            Cscu,
        ),
        spec(
            Sale,
            "<CEntityComponentCommodityUIProvider::SendCommoditySellRequest>",
            r"shopName\[(?P<shop>[^\]]+)\].*?amount\[(?P<price>[\d.]+)\].*?resourceGUID\[(?P<resource>[^\]]+)\].*?quantity\[(?P<quantity>\d+)\]",
            Units,
        ),
        spec(
            MissionEnded,
            "<EndMission>",
            r"MissionId\[(?P<mission>[^\]]+)\]\s+Player\[(?P<player>[^\]]+)\]\s+PlayerId\[(?P<player_id>[^\]]+)\]\s+CompletionType\[(?P<completion>[^\]]+)\]\s+Reason\[(?P<reason>[^\]]+)\]",
            Units,
        ),
    ]
}
