pub mod blocks;
pub mod checkpoint;
pub mod inference;
pub mod resnet;
pub mod valid;
