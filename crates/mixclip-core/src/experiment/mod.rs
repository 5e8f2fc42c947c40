//! The blending experiment: combine embeddings over an alpha grid, evaluate
//! every condition, and summarize the results.

pub mod analysis;
pub mod combine;
pub mod inventory;
pub mod representation;
pub mod results;
pub mod run;

pub use combine::{combine_grid, combine_pair, CombineOptions, CombineReport, SkipReason};
pub use inventory::{check_counts, CountCheck};
pub use representation::{DropoutLevel, InfoLevel, Pairing};
pub use results::{BaselineRow, CsvRecord, CsvSink, ResultRow, RowSink};
pub use run::{run_baselines, run_grid, GridOptions, GridSummary};
