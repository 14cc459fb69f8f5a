use std::{fmt, io};

/// Errors that may occur while encoding a query or decoding a response.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The message is shorter than one of its fields claims it to be.
    TruncatedMessage,
    /// A domain name label exceeds 63 bytes.
    LabelTooLong,
    /// A compressed domain name pointer was encountered where a name had to be decoded.
    ///
    /// Following pointers is not supported.
    UnsupportedCompression,
    /// A field was set to an invalid value.
    InvalidValue,
    /// The transaction ID of a response did not match the query.
    ///
    /// This is expected on multicast groups and broadcast segments, where unrelated traffic
    /// arrives on the same socket. Such datagrams should be dropped and the receive loop continued.
    NotOurResponse,
    /// No matching response arrived before the deadline.
    Timeout,
}

impl Error {
    fn description(&self) -> &str {
        match self {
            Error::TruncatedMessage => "message truncated",
            Error::LabelTooLong => "label too long",
            Error::UnsupportedCompression => "compressed domain names are not supported",
            Error::InvalidValue => "invalid value",
            Error::NotOurResponse => "response does not match the query's transaction ID",
            Error::Timeout => "no response",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::TruncatedMessage => io::ErrorKind::UnexpectedEof.into(),
            Error::LabelTooLong => io::Error::new(
                io::ErrorKind::InvalidInput,
                "domain name label exceeds maximum label length",
            ),
            Error::UnsupportedCompression => io::Error::new(
                io::ErrorKind::InvalidData,
                "cannot decode compressed domain name",
            ),
            Error::InvalidValue => io::ErrorKind::InvalidData.into(),
            Error::NotOurResponse => io::Error::new(io::ErrorKind::InvalidData, e),
            Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, e),
        }
    }
}
