use std::fmt;
use std::convert::From;
use std::error::Error as StdError;
use std::io::Error as IoError;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug)]
pub enum ErrorKind {
    Json(serde_json::Error),
    InternalIo(IoError),
    Generic,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub desc: String,
    pub detail: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.detail {
            Some(ref detail) => write!(f, "{}: {}", &self.desc, detail),
            None => write!(f, "{}", &self.desc),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.kind {
            ErrorKind::Json(ref e) => Some(e),
            ErrorKind::InternalIo(ref e) => Some(e),
            ErrorKind::Generic => None,
        }
    }
}

#[macro_export]
macro_rules! specific_fail {
    ($short:expr) => {{
        use $crate::errors::{Error, ErrorKind};
        Err(::std::convert::From::from(
            Error {
                kind: ErrorKind::Generic,
                desc: $short,
                detail: None
            }
        ))
    }}
}

#[macro_export]
macro_rules! specific_fail_str {
    ($s:expr) => {
        $crate::specific_fail!($s.to_string())
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        let desc = err.to_string();
        Error {
            kind: ErrorKind::InternalIo(err),
            desc,
            detail: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        let detail = err.to_string();
        Error {
            kind: ErrorKind::Json(err),
            desc: "invalid profile JSON".to_string(),
            detail: Some(detail),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Error {
        Error::from(err.error)
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: "formatting error".to_string(),
            detail: None,
        }
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err,
            detail: None,
        }
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err.to_string(),
            detail: None,
        }
    }
}
