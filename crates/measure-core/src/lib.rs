//! # measure-core
//!
//! The dimensional analysis engine: measures, units and measurements.
//!
//! A *measure* is a dimension (distance, duration, temperature) with a table
//! of named units. Every measurement stores its amount in the measure's
//! internal arbitrary unit and converts on read, so arithmetic never depends
//! on the display unit.
//!
//! ## Measure Variants
//!
//! - `Scalar`: the dimensionless measure.
//! - `Basic`: an atomic dimension with a unit table.
//! - `Derived`: a canonical compound of basic measures with integer
//!   exponents, interned per registry so that structurally equal compounds
//!   are the same instance.
//! - `LinearDelta` / `AggregateMeasure`: the interval and point views of
//!   affine measures (temperature), and of any other measure.
//! - `DynamicBasic` / `DynamicDerived`: measures whose coefficients may change
//!   after measurements exist; those measurements re-read the live table.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no I/O.
//! - Deterministic: `BTreeMap` only, primitives ordered by creation id.
//! - Fallible operations return `MeasureError`; user input never panics.

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregate;
pub mod basic;
pub mod catalogue;
pub mod commons;
pub mod constants;
pub mod derived;
pub mod dynamic;
pub mod format;
pub mod grammar;
pub mod linear;
pub mod measure;
pub mod measurement;
pub mod registry;
pub mod types;
pub mod util;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{MeasureError, MeasureId, Unit, UnitDef};

// =============================================================================
// RE-EXPORTS: Measure Algebra
// =============================================================================

pub use basic::BasicMeasure;
pub use derived::{Assignment, DerivedMeasure};
pub use dynamic::{Decomposition, DynamicMeasure, LiveUnit, UnitExponents};
pub use linear::{Ladder, LadderDef, LinearMeasure};
pub use measure::{Measure, Primitive};
pub use registry::MeasureRegistry;

// =============================================================================
// RE-EXPORTS: Measurements
// =============================================================================

pub use aggregate::{AggregateMeasure, AggregateMeasurement, Difference, UnitScale};
pub use format::{DecimalFormat, FormatSpec};
pub use measurement::{Measurement, Operand};

// =============================================================================
// RE-EXPORTS: Catalogues
// =============================================================================

pub use catalogue::{Catalogue, CatalogueSpec, DerivedSpec, LadderSpec, LinearSpec, MeasureSpec};
pub use commons::Commons;
