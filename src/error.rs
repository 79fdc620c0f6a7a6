use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Zip(zip::result::ZipError),
    /// An image payload that could not be sniffed or decoded.
    Image(String),
    /// A font file that could not be mapped or parsed.
    Font(String),
    /// A record manifest that could not be turned into an `SopRecord`.
    InvalidRecord(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Zip(e) => write!(f, "XLSX packaging error: {e}"),
            Error::Image(msg) => write!(f, "image error: {msg}"),
            Error::Font(msg) => write!(f, "font error: {msg}"),
            Error::InvalidRecord(msg) => write!(f, "invalid SOP record: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Zip(e) => Some(e),
            Error::Image(_) | Error::Font(_) | Error::InvalidRecord(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}
