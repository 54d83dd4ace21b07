//! Similarity scoring and difference localization for rendered pages.
//!
//! - [`text_similarity`]: matching-block ratio between two page texts
//! - [`ssim`]: structural similarity between two rasters
//! - [`regions`]: difference mask, connected regions, merge and enlarge passes
//! - [`annotate`]: drawing rectangles and arrows over differing regions
//! - [`image_io`]: raster decoding and PNG artifact persistence

pub mod annotate;
pub mod image_io;
pub mod regions;
pub mod ssim;
pub mod text_similarity;
