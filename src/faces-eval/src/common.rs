pub const CHANNELS: usize = 3;
pub const IMAGE_SIZE: usize = 224;
pub const NUM_CLASSES: usize = 12;

pub const ARCHITECTURE: &str = "VGGFace2_ResNet50";
pub const RESULTS_DIR: &str = "results";
pub const IMAGES_DIR: &str = "images";
pub const PARTITIONS_FILE: &str = "metadata/partitions.csv";
