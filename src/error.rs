use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Resolution itself never fails with an error: a reference that cannot be resolved yields
/// `None`, which is the model's "unresolved" sentinel. Errors are reserved for the outer
/// boundaries of the object model: parsing identities, validating the host configuration and
/// loading units through a [`crate::metadata::host::UnitLoader`].
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - A display name, version string or builder input could not be parsed
/// - [`Error::InvalidConfiguration`] - The host configuration violates its constraints
///
/// ## Loading Errors
/// - [`Error::UnitNotFound`] - A unit loader could not produce the requested unit
///
/// ## Analysis Errors
/// - [`Error::RecursionLimit`] - Maximum resolution depth exceeded
///
/// # Examples
///
/// ```rust
/// use dotmodel::{Error, metadata::identity::AssemblyIdentity};
///
/// match AssemblyIdentity::parse("mscorlib, Version=4.0.0.0, PublicKeyToken=xyz") {
///     Ok(identity) => println!("parsed {}", identity.name),
///     Err(Error::Malformed { message, .. }) => eprintln!("bad display name: {}", message),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is malformed.
    ///
    /// Raised for unparseable assembly display names, version strings, public key
    /// tokens, and inconsistent builder input. Carries the source location of the check
    /// that rejected it.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The host configuration is invalid.
    ///
    /// Raised by [`crate::metadata::config::HostConfig::validate`], for example when the
    /// pointer size is neither 4 nor 8 bytes.
    #[error("Invalid host configuration - {0}")]
    InvalidConfiguration(String),

    /// A unit loader could not locate or build the requested unit.
    ///
    /// The string is the strong name of the unit that was requested.
    #[error("Unit could not be loaded - {0}")]
    UnitNotFound(String),

    /// Recursion limit reached.
    ///
    /// Resolution walks nested, aliased and generic references recursively. The depth is
    /// bounded by [`crate::metadata::config::HostConfig::max_resolution_depth`] so that alias
    /// cycles in malformed metadata terminate.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}
