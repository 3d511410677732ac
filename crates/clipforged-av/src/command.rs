//! Argument-vector construction.
//!
//! [`CommandBuilder::build`] renders a resolved [`ParameterSet`] through a
//! recipe into a [`CommandLine`]: a program plus discrete argument tokens,
//! never a shell string. Render functions only see parameters through a
//! [`RenderScope`], which enforces the slot contract:
//!
//! - a placeholder must be a declared slot with a resolved value,
//! - path placeholders must carry paths issued by the file store,
//! - free text is only available raw as a whole token or escaped for the
//!   filtergraph,
//! - every resolved slot must be consumed by the render function.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::escape::escape_filter_text;
use crate::params::{ParamValue, ParameterSet};
use crate::recipe::{Recipe, Slot};
use crate::store::FileStore;
use crate::{Error, Result};

/// Default font used by caption recipes.
pub const DEFAULT_FONTFILE: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Global engine options placed before every recipe's own arguments.
///
/// `-y` only ever overwrites the empty file the store claimed for this job.
const GLOBAL_ARGS: &[&str] = &["-hide_banner", "-nostdin", "-y"];

/// A program and its argument tokens, ready to spawn without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
    output: PathBuf,
}

impl CommandLine {
    #[cfg(test)]
    pub(crate) fn from_parts(program: &str, args: &[&str], output: &str) -> Self {
        Self {
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
            output: PathBuf::from(output),
        }
    }

    /// Program to execute.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument tokens after the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Output file the last token refers to.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument vector including the program name.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Human-readable rendering with POSIX single-quoting.
    ///
    /// Only for previews and logs; execution never goes through a shell.
    pub fn to_display_string(&self) -> String {
        self.argv()
            .iter()
            .map(|token| quote_for_display(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_display(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

/// Environment values injected into every render.
#[derive(Debug, Clone)]
pub struct RenderEnv {
    /// Engine executable.
    pub program: PathBuf,
    /// Font used by caption recipes.
    pub fontfile: PathBuf,
}

impl Default for RenderEnv {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            fontfile: PathBuf::from(DEFAULT_FONTFILE),
        }
    }
}

/// Parameter access for a render function.
pub struct RenderScope<'a> {
    recipe: &'a Recipe,
    params: &'a ParameterSet,
    store: &'a dyn FileStore,
    env: &'a RenderEnv,
    args: Vec<String>,
    used: BTreeSet<&'static str>,
}

impl<'a> RenderScope<'a> {
    /// Append a literal token.
    pub fn arg(&mut self, token: impl Into<String>) -> &mut Self {
        self.args.push(token.into());
        self
    }

    /// Append several literal tokens.
    pub fn args(&mut self, tokens: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Append `-i <path>` for a path slot.
    pub fn input(&mut self, slot: &str) -> Result<&mut Self> {
        let path = self.path(slot)?;
        self.args.push("-i".to_string());
        self.args.push(path);
        Ok(self)
    }

    /// Store-issued path of a path slot.
    pub fn path(&mut self, slot: &str) -> Result<String> {
        let (slot, value) = self.lookup(slot)?;
        let ParamValue::Path(stored) = value else {
            return Err(self.mismatch(slot, "a path"));
        };
        let path = stored.as_path();
        if !self.store.is_issued(path) {
            return Err(Error::unsafe_path(
                slot.name,
                "path was not issued by the file store",
            ));
        }
        path.to_str()
            .map(str::to_string)
            .ok_or_else(|| Error::unsafe_path(slot.name, "path is not valid UTF-8"))
    }

    /// Validated numeric or enumerated value.
    pub fn value(&mut self, slot: &str) -> Result<String> {
        let (slot, value) = self.lookup(slot)?;
        match value {
            ParamValue::Number(v) | ParamValue::Choice(v) => Ok(v.clone()),
            _ => Err(self.mismatch(slot, "a number or choice")),
        }
    }

    /// Free text for use as a complete argument token, outside any
    /// sub-language.
    pub fn text(&mut self, slot: &str) -> Result<String> {
        let (slot, value) = self.lookup(slot)?;
        match value {
            ParamValue::Text(v) => Ok(v.clone()),
            _ => Err(self.mismatch(slot, "text")),
        }
    }

    /// Free text escaped for a filter option inside a filtergraph.
    pub fn filter_text(&mut self, slot: &str) -> Result<String> {
        self.text(slot).map(|t| escape_filter_text(&t))
    }

    /// Configured font path, escaped for a filter option.
    pub fn fontfile(&self) -> String {
        escape_filter_text(&self.env.fontfile.to_string_lossy())
    }

    fn lookup(&mut self, name: &str) -> Result<(&'a Slot, &'a ParamValue)> {
        let recipe = self.recipe;
        let params = self.params;
        let slot = recipe.slot(name).ok_or_else(|| {
            Error::render(
                recipe.name,
                format!("placeholder {} is not a declared slot", name),
            )
        })?;
        let value = params.get(name).ok_or_else(|| {
            Error::render(
                recipe.name,
                format!("no value resolved for placeholder {}", name),
            )
        })?;
        self.used.insert(slot.name);
        Ok((slot, value))
    }

    fn mismatch(&self, slot: &Slot, expected: &str) -> Error {
        Error::render(
            self.recipe.name,
            format!("placeholder {} does not hold {}", slot.name, expected),
        )
    }
}

/// Renders recipes into command lines.
pub struct CommandBuilder<'a> {
    store: &'a dyn FileStore,
    env: &'a RenderEnv,
}

impl<'a> CommandBuilder<'a> {
    /// Create a builder that checks paths against `store`.
    pub fn new(store: &'a dyn FileStore, env: &'a RenderEnv) -> Self {
        Self { store, env }
    }

    /// Render `params` through `recipe`, writing to `output`.
    ///
    /// # Errors
    ///
    /// - [`Error::TemplateRender`] when the recipe, its slots and the
    ///   parameter set disagree.
    /// - [`Error::UnsafePathParameter`] when a path value was not issued by
    ///   the store.
    pub fn build(&self, recipe: &Recipe, params: &ParameterSet, output: &Path) -> Result<CommandLine> {
        if params.recipe() != recipe.name {
            return Err(Error::render(
                recipe.name,
                format!("parameters were resolved for {}", params.recipe()),
            ));
        }
        for slot in recipe.slots.iter().filter(|s| s.required) {
            if !params.contains(slot.name) {
                return Err(Error::render(
                    recipe.name,
                    format!("required slot {} has no value", slot.name),
                ));
            }
        }
        if let Some((name, _)) = params.iter().find(|(name, _)| recipe.slot(name).is_none()) {
            return Err(Error::render(
                recipe.name,
                format!("parameter {} is not a declared slot", name),
            ));
        }
        let output_token = match output.to_str() {
            Some(s) if output.is_absolute() => s.to_string(),
            _ => {
                return Err(Error::unsafe_path(
                    "outname",
                    "output path must be absolute UTF-8",
                ))
            }
        };

        let mut scope = RenderScope {
            recipe,
            params,
            store: self.store,
            env: self.env,
            args: Vec::new(),
            used: BTreeSet::new(),
        };
        scope.args(GLOBAL_ARGS.iter().copied());
        (recipe.render)(&mut scope)?;

        if let Some((name, _)) = params.iter().find(|(name, _)| !scope.used.contains(name)) {
            return Err(Error::render(
                recipe.name,
                format!("slot {} was resolved but never rendered", name),
            ));
        }

        let mut args = scope.args;
        args.push(output_token);

        #[cfg(feature = "tracing")]
        tracing::debug!("Built {} command with {} arguments", recipe.name, args.len());

        Ok(CommandLine {
            program: self.env.program.clone(),
            args,
            output: output.to_path_buf(),
        })
    }
}
