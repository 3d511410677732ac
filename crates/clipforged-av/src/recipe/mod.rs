//! Recipe and slot declarations.
//!
//! A [`Recipe`] pairs an ordered list of [`Slot`]s with a render function that
//! writes argument tokens through a [`RenderScope`]. Recipes are plain
//! `'static` data built once by the [`catalog`] and never mutated.

pub mod catalog;

use serde::Serialize;

use crate::command::RenderScope;
use crate::Result;

/// Validation format of a numeric slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFormat {
    /// `HH:MM:SS[.fff]` or non-negative decimal seconds.
    Timecode,
    /// Decimal strictly greater than zero.
    PositiveDecimal,
    /// Decimal within an inclusive range.
    Decimal { min: f64, max: f64 },
    /// Integer within an inclusive range.
    Integer { min: i64, max: i64 },
    /// Integer followed by an optional `k`/`m` unit suffix.
    Bitrate,
    /// Two non-negative integers joined by `:`.
    Position,
}

/// What a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// A media file issued by the file store.
    Input,
    /// A still image issued by the file store.
    ImageInput,
    /// Opaque caller text, escaped wherever it lands.
    Text,
    /// A number in the given format.
    Numeric(NumericFormat),
    /// One of a fixed set of values.
    Choice(&'static [&'static str]),
}

impl SlotKind {
    /// Whether values of this kind are file-store paths.
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Input | Self::ImageInput)
    }
}

/// A declared parameter of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Slot {
    pub name: &'static str,
    pub kind: SlotKind,
    pub default: Option<&'static str>,
    pub required: bool,
}

impl Slot {
    /// Required media input.
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Input,
            default: None,
            required: true,
        }
    }

    /// Required image input.
    pub const fn image(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::ImageInput,
            default: None,
            required: true,
        }
    }

    /// Free text with a default.
    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Text,
            default: Some(default),
            required: true,
        }
    }

    /// Number with a default.
    pub const fn numeric(name: &'static str, format: NumericFormat, default: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Numeric(format),
            default: Some(default),
            required: true,
        }
    }

    /// Enumerated value with a default.
    pub const fn choice(
        name: &'static str,
        allowed: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: SlotKind::Choice(allowed),
            default: Some(default),
            required: true,
        }
    }
}

/// Recipe class, used to pick output extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeClass {
    /// Attaches cover art; the output keeps the primary input's container.
    AudioCover,
    /// Animated web image output.
    ImageSequence,
    /// Joins several inputs into one container.
    Concat,
    /// Everything else.
    General,
}

/// Render function of a recipe.
pub type RenderFn = fn(&mut RenderScope<'_>) -> Result<()>;

/// A named, parameterized media transformation.
#[derive(Clone, Copy)]
pub struct Recipe {
    pub name: &'static str,
    pub description: &'static str,
    pub class: RecipeClass,
    pub slots: &'static [Slot],
    pub render: RenderFn,
}

impl Recipe {
    /// Look up a declared slot.
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// First path-valued slot; its extension drives output naming.
    pub fn primary_input(&self) -> Option<&Slot> {
        self.slots.iter().find(|s| s.kind.is_path())
    }

    /// Serializable description for listings.
    pub fn info(&self) -> RecipeInfo {
        RecipeInfo {
            name: self.name,
            description: self.description,
            class: self.class,
            slots: self.slots,
        }
    }
}

impl std::fmt::Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipe")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("slots", &self.slots)
            .finish()
    }
}

/// Listing view of a recipe.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub class: RecipeClass,
    pub slots: &'static [Slot],
}
