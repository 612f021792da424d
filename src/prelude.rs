// prelude.rs - Convenient re-exports for the host-facing API.
//
//! # Prelude
//!
//! ```
//! use ecma_regexp::prelude::*;
//!
//! let mut re = RegExp::new(r"\d+", "g").unwrap();
//! let out = re.replace("a1b22", Replacement::Template("#")).unwrap();
//! assert_eq!(out, "a#b#");
//! ```

pub use crate::api::{Engine, EngineBuilder, MatchAll, MatchResult, RegExp, RegExpBuilder};
pub use crate::config::{EngineConfig, MatchLimits};
pub use crate::error::RegexError;
pub use crate::regint::{Program, RegexFlags};
pub use crate::replace::{replace, RegExpObject, Replacement};
