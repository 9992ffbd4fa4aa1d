//! Individual preprocessing steps

pub mod bbox;
pub mod composite;
pub mod crop;
pub mod luminance;
pub mod pad;
