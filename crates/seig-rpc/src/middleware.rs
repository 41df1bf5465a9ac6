// crates/seig-rpc/src/middleware.rs
//
// Middleware for the RPC server.

use tonic::{Request, Status};

/// Logging interceptor for incoming requests.
///
/// The method name travels in the JSON body, so only transport metadata is
/// visible here; dispatch logs the method itself.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    tracing::debug!("Incoming RPC request: {:?}", req.metadata());
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interceptor_passes_request_through() {
        let mut req = Request::new(());
        req.metadata_mut()
            .insert("x-client", "seig-cli".parse().unwrap());
        let out = logging_interceptor(req).unwrap();
        assert_eq!(out.metadata().get("x-client").unwrap(), "seig-cli");
    }
}
