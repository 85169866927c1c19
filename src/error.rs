use std::fmt;

/// Everything that can go wrong while mutating or validating a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Growing node or sum storage failed.
    OutOfMemory,
    /// The compact store's index type cannot address another node.
    CapacityExceeded { max: usize },
    /// An integral weight sum went above the weight type's maximum.
    Overflow,
    /// An integral weight sum went below the weight type's minimum.
    Underflow,
    /// A checked lookup did not find its key.
    KeyNotFound,
    /// `check_tree` found a violated invariant.
    InvalidTree(&'static str),
    /// Internal links were found inconsistent; this is a bug in the tree.
    Corrupted(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::CapacityExceeded { max } => {
                write!(f, "capacity exceeded: at most {max} elements fit")
            }
            Error::Overflow => write!(f, "weight sum overflow"),
            Error::Underflow => write!(f, "weight sum underflow"),
            Error::KeyNotFound => write!(f, "key not found"),
            Error::InvalidTree(what) => write!(f, "invalid tree: {what}"),
            Error::Corrupted(what) => write!(f, "corrupted tree: {what}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        assert_eq!(
            "capacity exceeded: at most 32765 elements fit",
            Error::CapacityExceeded { max: 32765 }.to_string()
        );
        assert_eq!(
            "invalid tree: red node has a red child",
            Error::InvalidTree("red node has a red child").to_string()
        );
    }
}
