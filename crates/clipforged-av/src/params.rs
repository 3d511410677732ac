//! Parameter resolution.
//!
//! Merges caller values, uploads and slot defaults into a [`ParameterSet`]
//! that has been checked against every slot's declared kind. Resolution is
//! pure: it never reads the filesystem.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::recipe::{NumericFormat, Recipe, SlotKind};
use crate::store::StoredPath;
use crate::{Error, Result};

static CLOCK_TIMECODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}:[0-5]\d:[0-5]\d(\.\d{1,6})?$").expect("valid regex")
});

static UNSIGNED_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,9}(\.\d{0,9})?|\.\d{1,9})$").expect("valid regex"));

static SIGNED_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d{1,9}(\.\d{0,9})?|\.\d{1,9})$").expect("valid regex"));

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,9}$").expect("valid regex"));

static BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{0,8}[kKmM]?$").expect("valid regex"));

static POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,5}:\d{1,5}$").expect("valid regex"));

/// A validated slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Store-issued file.
    Path(StoredPath),
    /// Opaque caller text; must be escaped by whoever renders it.
    Text(String),
    /// Canonical numeric literal.
    Number(String),
    /// Member of the slot's allowed set.
    Choice(String),
}

/// Fully resolved parameters for one recipe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    recipe: &'static str,
    values: BTreeMap<&'static str, ParamValue>,
}

impl ParameterSet {
    /// Name of the recipe these parameters were resolved for.
    pub fn recipe(&self) -> &'static str {
        self.recipe
    }

    /// Look up a value by slot name.
    pub fn get(&self, slot: &str) -> Option<&ParamValue> {
        self.values.get(slot)
    }

    /// Whether a value is present for the slot.
    pub fn contains(&self, slot: &str) -> bool {
        self.values.contains_key(slot)
    }

    /// Iterate over `(slot, value)` pairs in slot-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Number of resolved values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values were resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve caller input against a recipe's slots.
///
/// For each slot, in declaration order: an upload wins for path slots, then a
/// non-empty caller value, then the slot default. A required slot left
/// without a value fails with [`Error::MissingRequiredParameter`]. Caller
/// keys that name no slot are ignored.
pub fn resolve(
    recipe: &Recipe,
    user_values: &HashMap<String, String>,
    uploads: &HashMap<String, StoredPath>,
) -> Result<ParameterSet> {
    let mut values = BTreeMap::new();

    for slot in recipe.slots {
        let user = user_values
            .get(slot.name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty());

        if slot.kind.is_path() {
            match (uploads.get(slot.name), user) {
                (Some(stored), _) => {
                    values.insert(slot.name, ParamValue::Path(stored.clone()));
                }
                (None, Some(_)) => {
                    return Err(Error::unsafe_path(
                        slot.name,
                        "path parameters must be uploaded, not named",
                    ));
                }
                (None, None) if slot.required => return Err(Error::missing(slot.name)),
                (None, None) => {}
            }
            continue;
        }

        let Some(raw) = user.or(slot.default) else {
            if slot.required {
                return Err(Error::missing(slot.name));
            }
            continue;
        };

        let value = match slot.kind {
            SlotKind::Text => ParamValue::Text(raw.to_string()),
            SlotKind::Numeric(format) => ParamValue::Number(validate_numeric(slot.name, format, raw)?),
            SlotKind::Choice(allowed) => ParamValue::Choice(validate_choice(slot.name, allowed, raw)?),
            SlotKind::Input | SlotKind::ImageInput => continue,
        };
        values.insert(slot.name, value);
    }

    Ok(ParameterSet {
        recipe: recipe.name,
        values,
    })
}

/// Check a numeric literal against its format and return the canonical form.
pub fn validate_numeric(slot: &str, format: NumericFormat, raw: &str) -> Result<String> {
    let value = raw.trim();
    match format {
        NumericFormat::Timecode => {
            if CLOCK_TIMECODE.is_match(value) || UNSIGNED_DECIMAL.is_match(value) {
                Ok(value.to_string())
            } else {
                Err(Error::malformed(
                    slot,
                    "expected HH:MM:SS[.fff] or non-negative seconds",
                ))
            }
        }
        NumericFormat::PositiveDecimal => {
            let parsed = parse_decimal(slot, value, &UNSIGNED_DECIMAL)?;
            if parsed > 0.0 {
                Ok(value.to_string())
            } else {
                Err(Error::malformed(slot, "expected a positive decimal"))
            }
        }
        NumericFormat::Decimal { min, max } => {
            let parsed = parse_decimal(slot, value, &SIGNED_DECIMAL)?;
            if (min..=max).contains(&parsed) {
                Ok(value.to_string())
            } else {
                Err(Error::malformed(
                    slot,
                    format!("expected a decimal between {} and {}", min, max),
                ))
            }
        }
        NumericFormat::Integer { min, max } => {
            if !INTEGER.is_match(value) {
                return Err(Error::malformed(slot, "expected an integer"));
            }
            let parsed: i64 = value
                .parse()
                .map_err(|_| Error::malformed(slot, "expected an integer"))?;
            if (min..=max).contains(&parsed) {
                Ok(parsed.to_string())
            } else {
                Err(Error::malformed(
                    slot,
                    format!("expected an integer between {} and {}", min, max),
                ))
            }
        }
        NumericFormat::Bitrate => {
            if BITRATE.is_match(value) {
                Ok(value.to_string())
            } else {
                Err(Error::malformed(slot, "expected a bitrate such as 128k"))
            }
        }
        NumericFormat::Position => {
            if POSITION.is_match(value) {
                Ok(value.to_string())
            } else {
                Err(Error::malformed(slot, "expected a position such as 10:20"))
            }
        }
    }
}

fn parse_decimal(slot: &str, value: &str, shape: &Regex) -> Result<f64> {
    if !shape.is_match(value) {
        return Err(Error::malformed(slot, "expected a decimal number"));
    }
    value
        .parse::<f64>()
        .map_err(|_| Error::malformed(slot, "expected a decimal number"))
}

fn validate_choice(slot: &str, allowed: &[&str], raw: &str) -> Result<String> {
    let value = raw.trim();
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(Error::InvalidEnumValue {
            slot: slot.to_string(),
            allowed: allowed.join(", "),
        })
    }
}
