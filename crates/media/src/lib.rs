//! Image generation for directives found in completion replies.

pub mod error;
pub mod generator;
pub mod pollinations;

pub use {
    error::{Error, Result},
    generator::{GeneratedImage, ImageGenerator},
    pollinations::PollinationsGenerator,
};
