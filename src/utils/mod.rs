//! Utility functions for the segmentation engine.
//!
//! This module provides image loading and saving helpers, rectangle cropping,
//! text normalization for recognized field text, debug overlays and logging
//! setup.

pub mod crop;
pub mod image;
pub mod text;
pub mod visualization;

pub use crop::RectCrop;
pub use self::image::{load_rgb, save_rgb};
pub use text::{reduce_whitespace, remove_words};
pub use visualization::{OverlayStyle, draw_box_overlay, marker_rect};

/// Installs a formatting `tracing` subscriber filtered by `RUST_LOG`.
///
/// Falls back to the `info` level when `RUST_LOG` is unset or invalid.
/// Calling it again after a subscriber is installed has no effect.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
