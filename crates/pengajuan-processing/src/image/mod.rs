//! Image processing module

pub mod transparency;
