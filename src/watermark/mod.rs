//! Watermark specification, geometry, shape building, and placement.
//!
//! The pipeline: a caller builds an immutable [`Watermark`] and
//! [`PlacementOptions`], the geometry resolver computes page anchors, the
//! shape builder turns the watermark into a reusable [`shape::Shape`] template,
//! and the [`Watermarker`] instantiates the template into the document at
//! the resolved locations, optionally locking the targeted sections.

pub mod builder;
pub mod geometry;
pub mod options;
pub mod placement;
pub mod shape;
pub mod spec;

pub use builder::{BuiltinFontMetrics, FontMetricsProvider, ShapeBuilder, TextExtent};
pub use options::{LockKind, LockOptions, PlacementOptions, PlacementTarget};
pub use placement::Watermarker;
pub use spec::{
    Font, HorizontalAlignment, ImageWatermark, Measure, TextWatermark, TileOptions,
    VerticalAlignment, Watermark,
};
