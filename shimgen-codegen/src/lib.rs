//! shimgen: type-erasure interface shims
//!
//! Describe an interface once (a name, optional generic parameters and an
//! ordered list of operations) and generate the boilerplate that lets any
//! concrete type be used through it at runtime, without inheritance:
//!
//! - an opaque **data reference** to the concrete value,
//! - a **dispatch table** with one function pointer per operation,
//! - per-type **table construction** that forwards to the concrete type,
//! - a **handle** pairing data and table, and a `make_<name>` factory.
//!
//! Interfaces are read from TOML or a compact IDL (see [`parse`]), checked
//! (see [`check`]) and emitted as Rust or C++ source (see [`emit`]).
//!
//! # Usage
//!
//! ```rust
//! use shimgen_codegen::{generate, GenerateOptions, Source};
//!
//! let idl = r#"
//! interface Counter {
//!     readonly fn get() -> i32;
//!     fn inc();
//! }
//! "#;
//!
//! let artifact = generate(Source::Idl(idl), &GenerateOptions::default()).unwrap();
//! let rust = artifact.render();
//! assert!(rust.contains("pub trait CounterImpl"));
//! assert!(rust.contains("pub fn make_counter"));
//!
//! let listed = shimgen_codegen::advisory::extract(&rust);
//! assert_eq!(listed.len(), 2);
//! ```

pub mod advisory;
pub mod check;
pub mod driver;
pub mod emit;
pub mod error;
pub mod model;
pub mod parse;
pub mod types;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use advisory::{diff, extract, AdvisoryDiff, AdvisoryEntry};
pub use check::{is_valid, validate, CheckDiagnostic, Severity};
pub use driver::{check_for_target, generate, generate_with_report, GenerationReport, Source};
pub use emit::{
    Backend, Fragment, FragmentKind, GenerateOptions, GeneratedArtifact, Indent, Target,
};
pub use emit::{to_pascal_case, to_snake_case};
pub use error::{Diagnostic, EmissionError, ParseDiagnostic};
pub use model::{
    BindingMode, GenericParam, GuardStyle, InterfaceSpec, Mutability, OperationSpec,
    Optionality, Param,
};
pub use parse::SourceFormat;
pub use types::{TypeArg, TypeExpr};
