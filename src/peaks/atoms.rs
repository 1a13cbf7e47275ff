use std::fmt;
use std::num::ParseIntError;
use std::ops;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The positions of the atoms within the parent structure that a peak is attributed to.
///
/// The order the indices were read in is preserved, so writing them back out reproduces
/// the input exactly.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomIndices(Vec<u32>);

impl AtomIndices {
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u32> {
        self.0.iter()
    }

    pub fn push(&mut self, index: u32) {
        self.0.push(index)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Decode an atom bitmask, where bit `i` being set means atom `i` belongs to
    /// the fragment. Indices are produced in ascending order.
    pub fn from_bitmask(mask: u128) -> Self {
        let mut indices = Vec::with_capacity(mask.count_ones() as usize);
        let mut rest = mask;
        while rest != 0 {
            let i = rest.trailing_zeros();
            indices.push(i);
            rest &= rest - 1;
        }
        Self(indices)
    }

    /// Encode these indices back into a bitmask. Returns `None` when an index does
    /// not fit in 128 bits.
    pub fn to_bitmask(&self) -> Option<u128> {
        self.0.iter().try_fold(0u128, |acc, i| {
            1u128.checked_shl(*i).map(|bit| acc | bit)
        })
    }
}

impl ops::Index<usize> for AtomIndices {
    type Output = u32;

    fn index(&self, i: usize) -> &Self::Output {
        &self.0[i]
    }
}

impl From<Vec<u32>> for AtomIndices {
    fn from(value: Vec<u32>) -> Self {
        Self(value)
    }
}

impl FromIterator<u32> for AtomIndices {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AtomIndices {
    type Item = &'a u32;
    type IntoIter = std::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Comma separated, without enclosing brackets
impl fmt::Display for AtomIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// Parses the loose list notations found in tabular exports: `[1, 2, 3]`, `1 2 3`,
/// `1;2;3`, or an empty string / `[]` for no annotation.
impl FromStr for AtomIndices {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .trim_start_matches(['[', '(', '{'])
            .trim_end_matches([']', ')', '}']);
        inner
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| tok.parse::<u32>())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bitmask() {
        let atoms = AtomIndices::from_bitmask(0b1011_0001);
        assert_eq!(atoms.as_slice(), &[0, 4, 5, 7]);
        assert_eq!(atoms.to_bitmask(), Some(0b1011_0001));

        let atoms = AtomIndices::from_bitmask(1u128 << 127);
        assert_eq!(atoms.as_slice(), &[127]);
        assert!(AtomIndices::from_bitmask(0).is_empty());

        assert_eq!(AtomIndices::new(vec![128]).to_bitmask(), None);
    }

    #[test]
    fn test_parse_loose() {
        assert_eq!("[1, 2, 3]".parse::<AtomIndices>().unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!("4 5".parse::<AtomIndices>().unwrap().as_slice(), &[4, 5]);
        assert_eq!("7;3".parse::<AtomIndices>().unwrap().as_slice(), &[7, 3]);
        assert!("[]".parse::<AtomIndices>().unwrap().is_empty());
        assert!("".parse::<AtomIndices>().unwrap().is_empty());
        assert!("[1, x]".parse::<AtomIndices>().is_err());
        assert_eq!(AtomIndices::new(vec![3, 1, 2]).to_string(), "3,1,2");
    }
}
