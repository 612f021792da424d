//! # ecma-regexp
//!
//! ECMAScript regular expressions in pure Rust: a single-pass pattern
//! compiler producing compact bytecode, a backtracking matcher over UTF-16
//! code units, a compiled-pattern cache and the `exec`/`replace` helpers a
//! JavaScript host builds `RegExp.prototype` on.
//!
//! ## Quick Start
//!
//! ```rust
//! use ecma_regexp::prelude::*;
//!
//! let mut re = RegExp::new(r"(?<y>\d{4})-(?<m>\d{2})-(?<d>\d{2})", "").unwrap();
//! let m = re.exec("Date: 2026-02-12").unwrap().unwrap();
//! assert_eq!(m.as_str(), "2026-02-12");
//! assert_eq!(m.index(), 6);
//! assert_eq!(m.name("m"), Some("02"));
//! ```
//!
//! Global and sticky expressions keep a `lastIndex` cursor between calls:
//!
//! ```rust
//! use ecma_regexp::prelude::*;
//!
//! let mut engine = Engine::new();
//! let mut re = engine.regexp("a+", "g").unwrap();
//! assert_eq!(re.exec("caaab aa").unwrap().unwrap().index(), 1);
//! assert_eq!(re.last_index(), 4);
//! assert_eq!(re.exec("caaab aa").unwrap().unwrap().index(), 6);
//! assert!(re.exec("caaab aa").unwrap().is_none());
//! assert_eq!(re.last_index(), 0);
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`regparse`] | Tokenizer and recursive-descent parser, drives emission |
//! | [`regcomp`] | Bytecode buffer and insertion-patching emitters |
//! | [`regint`] | Flags, opcodes, operand layout and [`regint::Program`] |
//! | [`regexec`] | Backtracking matcher and position search |
//! | [`regcache`] | Compiled-pattern cache |
//! | [`api`] | `Engine`, `RegExp`, `MatchResult` and the exec helper |
//! | [`replace`] | `replace` with template and callback substitution |
//! | [`regenc`], [`encodings`] | UTF-16 helpers and the input view |
//! | [`unicode`] | Character classification and case canonicalization |
//! | [`regerror`], [`error`] | Error kinds and the public error type |

// Enable #[coverage(off)] attribute when running under cargo-llvm-cov on nightly.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod encodings;
pub mod error;
pub mod prelude;
pub mod regcache;
pub mod regcomp;
pub mod regenc;
pub mod regerror;
pub mod regexec;
pub mod regint;
pub mod regparse;
pub mod regparse_types;
pub mod replace;
pub mod unicode;
