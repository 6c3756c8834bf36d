//! Pengajuan Processing Library
//!
//! Pure, network-free processing of submitted files: signature transparency
//! and attachment validation.

pub mod image;
pub mod validator;

pub use crate::image::transparency::{
    apply_transparency, make_transparent, ProcessedImage, TransparencyThresholds,
};
pub use validator::{AttachmentValidator, ValidationError};
