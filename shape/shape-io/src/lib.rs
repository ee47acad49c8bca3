//! Dataset loading, downsampling and persistence for shape modelling.
//!
//! - **Point files** - one `x y z` point per line ([`load_points`],
//!   [`save_points`])
//! - **[`ToothDataset`]** - every sample of one tooth, sorted by point count,
//!   with tag lookup and training/test partitioning
//! - **[`Downsampler`]** - point-count reduction, with a deterministic
//!   [`FarthestPointSampler`]
//! - **[`AlignedShapeStore`] / [`TransformStore`]** - aligned shapes as text
//!   files and their similarity transforms as JSON
//!
//! # Example
//!
//! ```no_run
//! use shape_io::{training_tags, ToothDataset};
//! use shape_types::Arch;
//!
//! let dataset = ToothDataset::load_dir("data/11").unwrap();
//! let training = training_tags(0, 129, &[Arch::Upper, Arch::Lower]);
//! let (train, test) = dataset.partition(&training);
//! println!("{} training, {} test", train.len(), test.len());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

mod dataset;
mod downsample;
mod error;
mod store;
mod txt;

pub use dataset::{training_tags, ToothDataset};
pub use downsample::{cap_point_count, Downsampler, FarthestPointSampler};
pub use error::{StoreError, StoreResult};
pub use store::{AlignedShapeStore, TransformFile, TransformRecord, TransformStore};
pub use txt::{load_points, save_points};
