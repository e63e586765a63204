tonic::include_proto!("message");
