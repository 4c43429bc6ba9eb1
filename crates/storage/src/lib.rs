//! S3/object storage for published reports and chain exports.
//!
//! Uploaded objects are private; readers get a time-limited presigned
//! GET link instead.

mod s3;

pub use s3::{DEFAULT_REGION, MAX_PRESIGN_TTL, S3Config, S3Storage};
