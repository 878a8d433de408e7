//! Storyboard Args
//!
//! Typed story args and the state that tracks user edits to them.
//!
//! # Overview
//!
//! - **ArgValue**: tagged arg value (scalars, mappings, sequences, opaque)
//! - **diff / combine**: structural deltas, replayable onto a new base
//! - **ArgsStore**: per-story initial and current args
//! - **GlobalsStore**: project-wide globals
//! - **persisted**: `key:value;...` codec for args in URLs
//!
//! # Example
//!
//! ```rust
//! use sb_args::{args_from_json, ArgUpdate, ArgsStore, ArgsUpdate, StoryArgsDef};
//! use serde_json::json;
//!
//! let mut store = ArgsStore::new();
//! store.set_initial(&StoryArgsDef::new("button--primary", args_from_json(json!({"x": 1}))));
//!
//! let edit = ArgsUpdate::from([("x".to_string(), ArgUpdate::set(2))]);
//! store.update("button--primary", &edit).unwrap();
//!
//! // Story reloads with a new default; the edit survives
//! store.set_initial(&StoryArgsDef::new("button--primary", args_from_json(json!({"x": 5}))));
//! assert_eq!(store.get("button--primary").unwrap()["x"], 2.0.into());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod arg_types;
pub mod delta;
pub mod error;
pub mod globals;
pub mod persisted;
pub mod store;
pub mod validation;
pub mod value;

// Re-exports
pub use arg_types::{infer_arg_types, merge_arg_types, ArgType, ArgTypes, Control, ControlKind, SbType};
pub use delta::{apply_patch, combine, diff, ArgsPatch, Change, Delta, Slot};
pub use error::{ArgsError, PersistedError};
pub use globals::GlobalsStore;
pub use persisted::{parse_args_param, stringify_args};
pub use store::{ArgUpdate, ArgsState, ArgsStore, ArgsUpdate, StoryArgs, StoryArgsDef};
pub use validation::{map_to_declared_types, validate};
pub use value::{args_from_json, args_to_json, ArgValue, Args, ValueKind};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for args handling
    pub use crate::{
        ArgType, ArgTypes, ArgUpdate, ArgValue, Args, ArgsError, ArgsStore, ArgsUpdate, Delta,
        GlobalsStore, SbType, StoryArgs,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
