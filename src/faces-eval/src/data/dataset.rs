use crate::{
    common::IMAGES_DIR,
    data::{
        fold::Fold,
        partitions::{PartitionEntry, Split, read_partition},
    },
};
use burn::data::dataset::Dataset;
use color_eyre::{
    Result,
    eyre::{WrapErr, bail, eyre},
};
use image::{RgbImage, imageops::FilterType};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// A decoded face image with its class label.
#[derive(Clone, Debug)]
pub struct FaceItem {
    pub image: RgbImage,
    pub label: usize,
    pub filename: String,
    pub fold: Fold,
}

/// The NIH Faces images of one fold/split, as listed in the partition table.
///
/// Images live under `<root_dir>/images/`; they are resized to
/// `image_size x image_size` and optionally mirrored on load.
pub struct NihFacesDataset {
    root_dir: PathBuf,
    fold: Fold,
    split: Split,
    mean_bgr: [f32; 3],
    image_size: u32,
    flip: bool,
    entries: Vec<PartitionEntry>,
}

impl NihFacesDataset {
    pub fn new(
        root_dir: impl AsRef<Path>,
        metadata_file: impl AsRef<Path>,
        fold: Fold,
        split: Split,
        mean_bgr: [f32; 3],
        image_size: usize,
        flip: bool,
    ) -> Result<Self> {
        let root_dir = root_dir.as_ref();
        if !root_dir.exists() {
            bail!("Dataset directory not found: {}", root_dir.display());
        }
        if image_size == 0 {
            bail!("Image size must be positive");
        }
        let image_size = u32::try_from(image_size)
            .wrap_err_with(|| format!("Image size {image_size} does not fit in u32"))?;
        let entries = read_partition(metadata_file.as_ref(), fold, split)
            .wrap_err_with(|| format!("Failed to read {split} partition of {fold}"))?;
        debug!("{fold}/{split}: {} samples listed", entries.len());

        Ok(Self {
            root_dir: root_dir.to_path_buf(),
            fold,
            split,
            mean_bgr,
            image_size,
            flip,
            entries,
        })
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn mean_bgr(&self) -> [f32; 3] {
        self.mean_bgr
    }

    pub fn image_path(&self, entry: &PartitionEntry) -> PathBuf {
        self.root_dir.join(IMAGES_DIR).join(&entry.filename)
    }

    pub fn load(&self, index: usize) -> Result<FaceItem> {
        let entry = self.entries.get(index).ok_or_else(|| {
            eyre!(
                "Index {index} out of range for {} samples",
                self.entries.len()
            )
        })?;
        let path = self.image_path(entry);
        let image = image::open(&path)
            .wrap_err_with(|| format!("Failed to read image {}", path.display()))?
            .resize_exact(self.image_size, self.image_size, FilterType::Triangle)
            .into_rgb8();
        let image = if self.flip {
            image::imageops::flip_horizontal(&image)
        } else {
            image
        };

        Ok(FaceItem {
            image,
            label: entry.label,
            filename: entry.filename.clone(),
            fold: self.fold,
        })
    }
}

impl Dataset<FaceItem> for NihFacesDataset {
    fn get(&self, index: usize) -> Option<FaceItem> {
        match self.load(index) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping sample {index}: {e:#}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    fn fixture() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(IMAGES_DIR)).unwrap();

        // Left half red, right half blue.
        let img = RgbImage::from_fn(8, 8, |x, _| if x < 4 { RED } else { BLUE });
        img.save(dir.path().join(IMAGES_DIR).join("half.png")).unwrap();

        let csv = dir.path().join("partitions.csv");
        std::fs::write(
            &csv,
            "filename,label,fold-1\nhalf.png,4,val\nmissing.png,1,val\nother.png,2,train\n",
        )
        .unwrap();
        (dir, csv)
    }

    fn dataset(dir: &TempDir, csv: &Path, size: usize, flip: bool) -> NihFacesDataset {
        let fold = Fold::new(1).unwrap();
        NihFacesDataset::new(dir.path(), csv, fold, Split::Val, fold.mean_bgr(), size, flip)
            .unwrap()
    }

    #[test]
    fn lists_only_requested_split() {
        let (dir, csv) = fixture();
        let ds = dataset(&dir, &csv, 8, false);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.split(), Split::Val);
    }

    #[test]
    fn load_resizes_and_keeps_metadata() {
        let (dir, csv) = fixture();
        let ds = dataset(&dir, &csv, 16, false);
        let item = ds.load(0).unwrap();
        assert_eq!(item.image.dimensions(), (16, 16));
        assert_eq!(item.label, 4);
        assert_eq!(item.filename, "half.png");
        assert_eq!(item.fold.to_string(), "fold-1");
    }

    #[test]
    fn flip_mirrors_horizontally() {
        let (dir, csv) = fixture();
        let plain = dataset(&dir, &csv, 8, false).load(0).unwrap();
        let flipped = dataset(&dir, &csv, 8, true).load(0).unwrap();
        assert_eq!(*plain.image.get_pixel(0, 0), RED);
        assert_eq!(*flipped.image.get_pixel(0, 0), BLUE);
        assert_eq!(*flipped.image.get_pixel(7, 7), RED);
    }

    #[test]
    fn unreadable_sample_is_an_error_from_load_and_none_from_get() {
        let (dir, csv) = fixture();
        let ds = dataset(&dir, &csv, 8, false);
        assert!(ds.load(1).is_err());
        assert!(ds.get(1).is_none());
        assert!(ds.load(2).is_err());
    }

    #[test]
    fn oversized_image_size_is_rejected() {
        let (dir, csv) = fixture();
        let fold = Fold::new(1).unwrap();
        let size = u32::MAX as usize + 1;
        let err =
            NihFacesDataset::new(dir.path(), &csv, fold, Split::Val, fold.mean_bgr(), size, false)
                .err()
                .unwrap();
        assert!(format!("{err:#}").contains("does not fit in u32"));
    }

    #[test]
    fn missing_root_is_rejected() {
        let (dir, csv) = fixture();
        let fold = Fold::new(1).unwrap();
        let missing = dir.path().join("nope");
        assert!(
            NihFacesDataset::new(missing, &csv, fold, Split::Val, fold.mean_bgr(), 8, false)
                .is_err()
        );
    }
}
