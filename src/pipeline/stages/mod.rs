// src/pipeline/stages/mod.rs

//! Built-in stage kinds.

pub mod concat;
pub mod css;
pub mod dest;
pub mod external;
pub mod image;
pub mod pxrem;
pub mod rename;
pub mod report;
pub mod sourcemaps;

pub use concat::ConcatStage;
pub use css::{AutoprefixStage, MinifyCssStage};
pub use dest::DestStage;
pub use external::{ExecStage, LintStage};
pub use image::OptimizeImageStage;
pub use pxrem::PxremStage;
pub use rename::RenameStage;
pub use report::{NotifyStage, SizeStage};
pub use sourcemaps::SourceMapsStage;
