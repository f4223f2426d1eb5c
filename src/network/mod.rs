pub mod auth;
pub mod transport;

pub use auth::{with_access_token, StaticTokenProvider, TokenProvider};
pub use transport::{BucketTransport, HttpBucketTransport};
