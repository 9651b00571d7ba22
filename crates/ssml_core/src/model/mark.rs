//! Mark domain model.
//!
//! # Responsibility
//! - Define the closed vocabulary of speech marks applied to text leaves.
//! - Validate mark payloads at construction so later passes never see
//!   malformed attributes.
//!
//! # Invariants
//! - A `MarkSet` holds at most one mark per `MarkKind`.
//! - `MarkSet` iteration order is the canonical kind order (declaration order
//!   of `MarkKind`), independent of insertion order.
//! - `RatePercent` is always within `0..=300`.
//! - `Alias` is never blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Upper bound accepted for speaking rate percentages.
pub const MAX_RATE_PERCENT: u16 = 300;

/// Closed set of mark kinds.
///
/// Variant order is the canonical nesting order used by serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Emphasis,
    Cardinal,
    Ordinal,
    Characters,
    Substitute,
    Pitch,
    Volume,
    Rate,
}

impl MarkKind {
    /// All kinds in canonical order.
    pub const ALL: [MarkKind; 8] = [
        MarkKind::Emphasis,
        MarkKind::Cardinal,
        MarkKind::Ordinal,
        MarkKind::Characters,
        MarkKind::Substitute,
        MarkKind::Pitch,
        MarkKind::Volume,
        MarkKind::Rate,
    ];

    /// Stable label used as the markup class and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emphasis => "emphasis",
            Self::Cardinal => "cardinal",
            Self::Ordinal => "ordinal",
            Self::Characters => "characters",
            Self::Substitute => "substitute",
            Self::Pitch => "pitch",
            Self::Volume => "volume",
            Self::Rate => "rate",
        }
    }

    /// Looks up a kind by label, ignoring ASCII case and surrounding whitespace.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(normalized))
    }

    /// Prosody kinds share one `<prosody>` element on export; the rest wrap.
    pub fn is_prosody(self) -> bool {
        matches!(self, Self::Pitch | Self::Volume | Self::Rate)
    }

    /// Flag kinds carry no payload besides their presence.
    pub fn is_flag(self) -> bool {
        matches!(self, Self::Cardinal | Self::Ordinal | Self::Characters)
    }
}

impl Display for MarkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mark construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkError {
    /// Value is not part of the kind's enumerated domain.
    UnknownValue { kind: MarkKind, value: String },
    /// Kind requires a value but none was given.
    MissingValue(MarkKind),
    /// Substitution alias is blank.
    EmptyAlias,
    /// Rate is not an integer.
    InvalidRate(String),
    /// Rate is outside `0..=300`.
    RateOutOfRange(i64),
}

impl Display for MarkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownValue { kind, value } => {
                write!(f, "unsupported {kind} value: `{value}`")
            }
            Self::MissingValue(kind) => write!(f, "{kind} mark requires a value"),
            Self::EmptyAlias => write!(f, "substitute alias must not be blank"),
            Self::InvalidRate(value) => write!(f, "rate must be an integer, got `{value}`"),
            Self::RateOutOfRange(value) => {
                write!(f, "rate {value} is outside 0..={MAX_RATE_PERCENT}")
            }
        }
    }
}

impl Error for MarkError {}

/// Emphasis strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmphasisLevel {
    Strong,
    Moderate,
    Reduced,
}

impl EmphasisLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Reduced => "reduced",
        }
    }
}

impl FromStr for EmphasisLevel {
    type Err = MarkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(Self::Strong),
            "moderate" => Ok(Self::Moderate),
            "reduced" => Ok(Self::Reduced),
            _ => Err(MarkError::UnknownValue {
                kind: MarkKind::Emphasis,
                value: value.to_string(),
            }),
        }
    }
}

/// Relative pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PitchLevel {
    XLow,
    Low,
    Medium,
    High,
    XHigh,
    Default,
}

impl PitchLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::XLow => "x-low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::XHigh => "x-high",
            Self::Default => "default",
        }
    }
}

impl FromStr for PitchLevel {
    type Err = MarkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "x-low" => Ok(Self::XLow),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "x-high" => Ok(Self::XHigh),
            "default" => Ok(Self::Default),
            _ => Err(MarkError::UnknownValue {
                kind: MarkKind::Pitch,
                value: value.to_string(),
            }),
        }
    }
}

/// Relative loudness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeLevel {
    Silent,
    XSoft,
    Soft,
    Medium,
    Loud,
    XLoud,
}

impl VolumeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::XSoft => "x-soft",
            Self::Soft => "soft",
            Self::Medium => "medium",
            Self::Loud => "loud",
            Self::XLoud => "x-loud",
        }
    }
}

impl FromStr for VolumeLevel {
    type Err = MarkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "x-soft" => Ok(Self::XSoft),
            "soft" => Ok(Self::Soft),
            "medium" => Ok(Self::Medium),
            "loud" => Ok(Self::Loud),
            "x-loud" => Ok(Self::XLoud),
            _ => Err(MarkError::UnknownValue {
                kind: MarkKind::Volume,
                value: value.to_string(),
            }),
        }
    }
}

/// Text spoken in place of the marked text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alias(String);

impl Alias {
    /// Creates an alias, rejecting blank values. Inner text is kept verbatim.
    pub fn new(value: impl Into<String>) -> Result<Self, MarkError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(MarkError::EmptyAlias);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Alias {
    type Error = MarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Alias> for String {
    fn from(value: Alias) -> Self {
        value.0
    }
}

/// Speaking rate as a percentage of the default rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct RatePercent(u16);

impl RatePercent {
    pub fn new(value: i64) -> Result<Self, MarkError> {
        if !(0..=i64::from(MAX_RATE_PERCENT)).contains(&value) {
            return Err(MarkError::RateOutOfRange(value));
        }
        // Range was checked above.
        Ok(Self(value as u16))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for RatePercent {
    type Error = MarkError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatePercent> for u16 {
    fn from(value: RatePercent) -> Self {
        value.0
    }
}

impl FromStr for RatePercent {
    type Err = MarkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_end_matches('%');
        let parsed = trimmed
            .parse::<i64>()
            .map_err(|_| MarkError::InvalidRate(value.to_string()))?;
        Self::new(parsed)
    }
}

/// A speech annotation applied uniformly to one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Mark {
    Emphasis(EmphasisLevel),
    Cardinal,
    Ordinal,
    Characters,
    Substitute(Alias),
    Pitch(PitchLevel),
    Volume(VolumeLevel),
    Rate(RatePercent),
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Self::Emphasis(_) => MarkKind::Emphasis,
            Self::Cardinal => MarkKind::Cardinal,
            Self::Ordinal => MarkKind::Ordinal,
            Self::Characters => MarkKind::Characters,
            Self::Substitute(_) => MarkKind::Substitute,
            Self::Pitch(_) => MarkKind::Pitch,
            Self::Volume(_) => MarkKind::Volume,
            Self::Rate(_) => MarkKind::Rate,
        }
    }

    /// Builds a mark from a kind and its textual value.
    ///
    /// Flag kinds ignore `value`; every other kind requires one.
    pub fn parse(kind: MarkKind, value: Option<&str>) -> Result<Self, MarkError> {
        let required = || value.ok_or(MarkError::MissingValue(kind));
        match kind {
            MarkKind::Cardinal => Ok(Self::Cardinal),
            MarkKind::Ordinal => Ok(Self::Ordinal),
            MarkKind::Characters => Ok(Self::Characters),
            MarkKind::Emphasis => Ok(Self::Emphasis(required()?.parse()?)),
            MarkKind::Substitute => Ok(Self::Substitute(Alias::new(required()?)?)),
            MarkKind::Pitch => Ok(Self::Pitch(required()?.parse()?)),
            MarkKind::Volume => Ok(Self::Volume(required()?.parse()?)),
            MarkKind::Rate => Ok(Self::Rate(required()?.parse()?)),
        }
    }

    /// Payload rendered as an attribute value; flags render as `true`.
    pub fn value_string(&self) -> String {
        match self {
            Self::Emphasis(level) => level.as_str().to_string(),
            Self::Cardinal | Self::Ordinal | Self::Characters => "true".to_string(),
            Self::Substitute(alias) => alias.as_str().to_string(),
            Self::Pitch(level) => level.as_str().to_string(),
            Self::Volume(level) => level.as_str().to_string(),
            Self::Rate(rate) => rate.get().to_string(),
        }
    }
}

/// Set of marks carried by one leaf, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Mark>", into = "Vec<Mark>")]
pub struct MarkSet {
    marks: Vec<Mark>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Iterates marks in canonical kind order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Mark> {
        self.marks.iter()
    }

    pub fn get(&self, kind: MarkKind) -> Option<&Mark> {
        self.marks.iter().find(|mark| mark.kind() == kind)
    }

    pub fn contains(&self, mark: &Mark) -> bool {
        self.get(mark.kind()) == Some(mark)
    }

    /// Inserts `mark`, replacing any mark of the same kind.
    pub fn insert(&mut self, mark: Mark) {
        match self
            .marks
            .binary_search_by(|existing| existing.kind().cmp(&mark.kind()))
        {
            Ok(index) => self.marks[index] = mark,
            Err(index) => self.marks.insert(index, mark),
        }
    }

    /// Removes the mark of `kind`, returning it when present.
    pub fn remove(&mut self, kind: MarkKind) -> Option<Mark> {
        let index = self.marks.iter().position(|mark| mark.kind() == kind)?;
        Some(self.marks.remove(index))
    }

    /// Returns a copy with `mark` inserted.
    pub fn with(&self, mark: Mark) -> Self {
        let mut next = self.clone();
        next.insert(mark);
        next
    }
}

impl From<Vec<Mark>> for MarkSet {
    fn from(value: Vec<Mark>) -> Self {
        value.into_iter().collect()
    }
}

impl From<MarkSet> for Vec<Mark> {
    fn from(value: MarkSet) -> Self {
        value.marks
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<T: IntoIterator<Item = Mark>>(iter: T) -> Self {
        let mut set = MarkSet::new();
        for mark in iter {
            set.insert(mark);
        }
        set
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.marks.iter()
    }
}
