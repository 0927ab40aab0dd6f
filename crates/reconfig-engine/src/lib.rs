//! Reconfig Engine
//!
//! Structural diff, classification and validation of database
//! configuration bundles.
//!
//! # Core Concepts
//!
//! - [`ConfigConstraint`]: Format, static/dynamic parameter sets, schema and reload triggers
//! - [`create_config_patch`]: Diff old and new bundles into a [`ConfigPatch`]
//! - [`is_update_dynamic`]: Decide between reload and restart
//! - [`validate`]: Check a candidate bundle against the constraint schema
//! - [`to_visualized_params`]: Render a patch as ordered change groups
//! - [`merge_updated_params`]: Apply operator edits to a bundle
//! - [`Reconfigurer`]: All of the above bound to one codec registry
//!
//! # Example
//!
//! ```rust,ignore
//! use reconfig_engine::{keys, Reconfigurer};
//!
//! let engine = Reconfigurer::new();
//! let (patch, _) = engine.create_config_patch(&old, &new, &formatter, &keys(["my.cnf"]), false)?;
//! if engine.is_update_dynamic(&constraint, &patch)? {
//!     println!("reload in place");
//! }
//! ```

#![warn(unreachable_pub)]

mod classify;
mod config;
mod constraint;
mod diff;
mod engine;
mod error;
mod merge;
mod patch;
mod policy;
mod registry;
mod schema;
mod validate;
mod visualize;

pub use classify::is_dynamic;
pub use config::EngineConfig;
pub use constraint::{
    AutoTrigger, ConfigConstraint, ConstraintIssue, ReloadOptions, ShellTrigger, TplScriptTrigger,
    UnixSignalTrigger, UNIX_SIGNALS,
};
pub use diff::{create_config_patch, has_excluded_changes, keys, ConfigObjects, Differ, Keys};
pub use engine::Reconfigurer;
pub use error::{ReconfigureError, Result};
pub use merge::{merge_and_validate, merge_updated_params, ParamPair};
pub use patch::{encode_update, ConfigPatch, UpdateDiff, UpdateType, UpdatedParam};
pub use policy::{is_update_dynamic, touched_params};
pub use registry::ConstraintRegistry;
pub use schema::{
    AdditionalProperties, ArraySchema, Bound, NumericSchema, ObjectSchema, Range, SchemaError,
    SchemaNode, StringSchema,
};
pub use validate::{validate, validate_object, Violation, ViolationKind};
pub use visualize::{render_table, to_visualized_params, ParamEntry, VisualizedParam};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
