//! Warden Authority - Remote Authority Client
//!
//! Typed access to the things service, the source of truth for which thing
//! owns a key and which things are connected to which channels.

pub mod grpc;
pub mod proto;
pub mod traits;

pub use grpc::GrpcAuthority;
pub use traits::RemoteAuthority;
