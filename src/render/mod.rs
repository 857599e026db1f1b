//! Display-side helpers
//!
//! Nothing here touches simulation state; the drawing layer reads
//! `DisplayState` and the candle snapshot and does its own rasterizing.

pub mod interp;

pub use interp::{DisplayState, RenderInterpolator};
