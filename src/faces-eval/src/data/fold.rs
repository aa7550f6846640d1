use color_eyre::{
    Report, Result,
    eyre::{bail, eyre},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const NUM_FOLDS: u8 = 5;

/// Pre-computed BGR channel means of the training split of each fold.
const MEAN_BGR: [[f32; 3]; NUM_FOLDS as usize] = [
    [112.482, 123.050, 147.127],
    [112.475, 123.011, 147.073],
    [112.359, 122.850, 147.066],
    [112.912, 123.480, 147.665],
    [112.554, 123.063, 147.243],
];

/// One of the five cross-validation folds, rendered as `fold-N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fold(u8);

impl Fold {
    pub const ALL: [Fold; NUM_FOLDS as usize] = [Fold(1), Fold(2), Fold(3), Fold(4), Fold(5)];

    pub fn new(number: u8) -> Result<Self> {
        if !(1..=NUM_FOLDS).contains(&number) {
            bail!("Fold number must be in 1..={NUM_FOLDS}, got {number}");
        }
        Ok(Fold(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn mean_bgr(self) -> [f32; 3] {
        MEAN_BGR[self.index()]
    }
}

impl fmt::Display for Fold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fold-{}", self.0)
    }
}

impl FromStr for Fold {
    type Err = Report;

    /// Accepts `fold-3` as well as a bare `3`.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().strip_prefix("fold-").unwrap_or(s.trim());
        let number: u8 = digits
            .parse()
            .map_err(|_| eyre!("Invalid fold {s:?}; expected fold-1 .. fold-{NUM_FOLDS}"))?;
        Fold::new(number)
    }
}

impl TryFrom<String> for Fold {
    type Error = Report;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Fold> for String {
    fn from(fold: Fold) -> Self {
        fold.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("fold-3".parse::<Fold>().unwrap(), Fold(3));
        assert_eq!("4".parse::<Fold>().unwrap(), Fold(4));
        assert_eq!(Fold(2).to_string(), "fold-2");
    }

    #[test]
    fn rejects_out_of_range() {
        assert!("fold-0".parse::<Fold>().is_err());
        assert!("fold-6".parse::<Fold>().is_err());
        assert!("fold-x".parse::<Fold>().is_err());
    }

    #[test]
    fn means_follow_fold_order() {
        assert_eq!(Fold(1).mean_bgr(), [112.482, 123.050, 147.127]);
        assert_eq!(Fold(5).mean_bgr(), [112.554, 123.063, 147.243]);
        assert_eq!(Fold::ALL.len(), 5);
    }

    #[test]
    fn serializes_as_name() {
        let json = serde_json::to_string(&Fold(1)).unwrap();
        assert_eq!(json, "\"fold-1\"");
        let back: Fold = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Fold(1));
    }
}
