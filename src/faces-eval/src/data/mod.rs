pub mod batch;
pub mod conversion;
pub mod dataset;
pub mod fold;
pub mod normalize;
pub mod partitions;
