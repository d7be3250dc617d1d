//! Compound actions: components, staged decoding, masks and text input

pub mod component;
pub mod compound;
pub mod input;

pub use component::{ActionComponent, ActionDims, Component};
pub use compound::{BuildRules, Capabilities, CompoundAction, Invalid, Stage};
pub use input::{parse_input, read_components, InputError};
