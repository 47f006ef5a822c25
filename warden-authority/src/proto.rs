//! Wire types and client stub for the things service.
//!
//! Only the two RPCs Warden needs are modelled:
//!
//! ```proto
//! package mainflux;
//!
//! service ThingsService {
//!     rpc CanAccessByID(AccessByIDReq) returns (google.protobuf.Empty) {}
//!     rpc Identify(Token) returns (ThingID) {}
//! }
//!
//! message AccessByIDReq { string thingID = 1; string chanID = 2; }
//! message ThingID { string value = 1; }
//! message Token { string value = 1; }
//! ```
//!
//! The messages are declared with `prost` derives directly so the crate
//! builds without `protoc`.

/// Thing key presented for identification.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Token {
    #[prost(string, tag = "1")]
    pub value: String,
}

/// Identifier of a thing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingId {
    #[prost(string, tag = "1")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccessByIdReq {
    #[prost(string, tag = "1")]
    pub thing_id: String,
    #[prost(string, tag = "2")]
    pub chan_id: String,
}

pub mod things_service_client {
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::transport::Channel;
    use tonic::GrpcMethod;

    const SERVICE: &str = "mainflux.ThingsService";

    /// Unary client for `mainflux.ThingsService`.
    ///
    /// Cloning is cheap; clones share the underlying channel.
    #[derive(Debug, Clone)]
    pub struct ThingsServiceClient {
        inner: tonic::client::Grpc<Channel>,
    }

    impl ThingsServiceClient {
        pub fn new(channel: Channel) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel),
            }
        }

        pub async fn identify(
            &mut self,
            request: impl tonic::IntoRequest<super::Token>,
        ) -> Result<tonic::Response<super::ThingId>, tonic::Status> {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static("/mainflux.ThingsService/Identify");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new(SERVICE, "Identify"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn can_access_by_id(
            &mut self,
            request: impl tonic::IntoRequest<super::AccessByIdReq>,
        ) -> Result<tonic::Response<()>, tonic::Status> {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static("/mainflux.ThingsService/CanAccessByID");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new(SERVICE, "CanAccessByID"));
            self.inner.unary(req, path, codec).await
        }

        async fn ready(&mut self) -> Result<(), tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("Service was not ready: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_access_request_field_tags() {
        let req = AccessByIdReq {
            thing_id: "thing-1".to_string(),
            chan_id: "7".to_string(),
        };
        let bytes = req.encode_to_vec();
        // field 1, wire type 2 (length-delimited)
        assert_eq!(bytes[0], 0x0a);
        assert_eq!(bytes[1] as usize, "thing-1".len());
        // field 2 follows the first string
        assert_eq!(bytes[2 + "thing-1".len()], 0x12);

        let decoded = AccessByIdReq::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_empty_thing_id_decodes_to_empty_string() {
        let decoded = ThingId::decode(&[][..]).unwrap();
        assert!(decoded.value.is_empty());
    }
}
