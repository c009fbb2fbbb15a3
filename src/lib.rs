//! Verification-condition generation core for a refinement-typed
//! intermediate representation: the IR data model, its binary codec, the
//! path-sensitive symbolic execution engine, and the global constraint
//! generator that elaborates nominal-type refinements into IR.
//!
//! See `DESIGN.md` for how each module grounds in the pack this crate was
//! written against, and `SPEC_FULL.md` for the full requirements.

/// Component A/B/C: types, constants, and the `Block`/`Entry`/`Code` IR
/// model plus qualified names.
pub mod ir;

/// Component D: the pooled binary container format (reader, writer, and
/// the pools themselves).
pub mod codec;

/// The IR consumer interface: `WyilFile`, `Declaration`, and the
/// construction-time uniqueness invariants a loader or writer must uphold.
pub mod module;

/// Component E: the global constraint generator, compiling a nominal
/// type's refinement predicate into a `Block`, memoized by qualified name.
pub mod generator;

/// Component F: `VcBranch`, the branch arena, and the `transform` driver
/// that walks a `Block` end to end.
pub mod branch;

/// Component G: the `VcTransformer` interface plus a reference
/// implementation (`DefaultTransformer`) used by this crate's own tests.
pub mod transformer;

/// Per-engine-instance configuration (recursion bounds, label prefixes).
pub mod config;

/// The aggregate `Error` enum every fallible public operation returns.
pub mod error;

pub use config::EngineConfig;
pub use error::Error;
