use std::{error, fmt, io, path::PathBuf};

/// The Error type
#[derive(Debug)]
pub enum Error {
    /// I/O errors
    Io(io::Error),
    /// Required resource file is missing
    MissingResource(PathBuf),
    /// Invalid entry in dictionary
    InvalidDictEntry(String),
    /// POS tag referenced by the dictionary but not defined
    UnknownPosTag(String),
    /// The prebuilt trie cache is unreadable or does not match the expected layout
    InvalidTrieCache(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::MissingResource(ref path) => write!(f, "missing resource: {}", path.display()),
            Error::InvalidDictEntry(ref err) => write!(f, "invalid dictionary entry: {}", err),
            Error::UnknownPosTag(ref tag) => write!(f, "unknown POS tag: {}", tag),
            Error::InvalidTrieCache(ref err) => write!(f, "invalid trie cache: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
