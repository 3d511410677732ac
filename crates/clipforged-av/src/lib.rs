//! # clipforged-av
//!
//! Recipe-driven media transformation on top of an external ffmpeg binary.
//!
//! This crate provides:
//! - A catalog of named recipes, each declaring typed parameter slots
//! - A resolver that turns caller input into a validated [`ParameterSet`]
//! - A builder that renders argument vectors with filtergraph escaping
//! - A supervisor that runs the engine with a deadline and kills its process
//!   group on expiry
//! - Output naming and a provenance-checked file store
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use clipforged_av::{resolve, CommandBuilder, PreviewStore, Registry, RenderEnv};
//!
//! let registry = Registry::builtin()?;
//! let recipe = registry.lookup("scale_fixed")?;
//! let store = PreviewStore::new("/srv/uploads", "/srv/outputs");
//! let uploads = HashMap::from([("in1".to_string(), store.placeholder("in1"))]);
//! let params = resolve(recipe, &HashMap::new(), &uploads)?;
//! let env = RenderEnv::default();
//! let cmd = CommandBuilder::new(&store, &env).build(recipe, &params, Path::new("/srv/outputs/out.mp4"))?;
//! println!("{}", cmd.to_display_string());
//! # Ok::<(), clipforged_av::Error>(())
//! ```

mod error;
pub mod command;
pub mod escape;
pub mod naming;
pub mod params;
pub mod recipe;
pub mod registry;
pub mod store;
pub mod supervisor;
pub mod tools;

// Re-exports
pub use command::{CommandBuilder, CommandLine, RenderEnv, DEFAULT_FONTFILE};
pub use error::{Error, Result};
pub use params::{resolve, ParamValue, ParameterSet};
pub use recipe::{Recipe, RecipeClass, RecipeInfo, Slot, SlotKind};
pub use registry::Registry;
pub use store::{DiskStore, FileStore, PreviewStore, StoredPath};
pub use supervisor::{Job, Outcome, Supervisor};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
