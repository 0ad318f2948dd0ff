//! Exit status codes used by the `crb` binary.
//! reference: [SYSEXITS](https://man.freebsd.org/cgi/man.cgi?query=sysexits&apropos=0&sektion=0&manpath=FreeBSD+11.2-stable&arch=default&format=html)

/// value: 65 <br>
/// A profile or an archive manifest is malformed, or a profile name is invalid.
pub const EX_DATAERR: i32 = 65;

/// value: 66 <br>
/// A profile or archive does not exist, or a backup selected no files.
pub const EX_NOINPUT: i32 = 66;

/// value: 69 <br>
/// The platform configuration directory could not be determined.
pub const EX_UNAVAILABLE: i32 = 69;

/// value: 73 <br>
/// An archive or profile could not be created because it already exists.
pub const EX_CANTCREAT: i32 = 73;

/// value: 74 <br>
/// Reading or writing a file failed.
pub const EX_IOERR: i32 = 74;

/// value: 75 <br>
/// The operation was cancelled by the user.
pub const EX_TEMPFAIL: i32 = 75;

/// value: 78 <br>
/// The settings file is malformed or has an unsupported version.
pub const EX_CONFIG: i32 = 78;
