use std::{error::Error as StdError, fmt, io};

#[derive(Debug)]
#[allow(missing_docs, clippy::module_name_repetitions)]
pub enum QmeshError {
    Io(io::Error),
    /// An index stream is not monotonic enough for high-watermark
    /// coding: the offending index introduces a vertex more than one
    /// slot above the highest index seen so far.
    IndexNotWatermarked(u32, u32),
    /// The byte stream ended before the structure it announced.
    Truncated(&'static str),
}

impl fmt::Display for QmeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QmeshError::Io(err) => err.fmt(f),
            QmeshError::IndexNotWatermarked(index, highest) => {
                write!(f, "index {index} skips past high watermark {highest}")
            }
            QmeshError::Truncated(section) => {
                write!(f, "tile byte stream truncated in {section}")
            }
        }
    }
}

impl From<io::Error> for QmeshError {
    fn from(other: io::Error) -> QmeshError {
        QmeshError::Io(other)
    }
}

impl StdError for QmeshError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        use QmeshError::{IndexNotWatermarked, Io, Truncated};
        match self {
            Io(err) => err.source(),
            IndexNotWatermarked(_, _) | Truncated(_) => None,
        }
    }
}
