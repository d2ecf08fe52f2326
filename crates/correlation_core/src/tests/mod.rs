
mod grpc;
