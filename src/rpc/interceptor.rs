//! Authentication in front of every RPC method.

use crate::auth::{Authenticator, RequestContext};
use crate::rpc::{RpcCode, RpcStatus};

/// Authenticate `ctx` and attach the principal. A context that already has
/// a principal passes through untouched.
///
/// Denials carry only the error id; the cause is in the log.
pub fn authorize(authenticator: &Authenticator, ctx: &mut RequestContext) -> Result<(), RpcStatus> {
    if ctx.principal().is_some() {
        return Ok(());
    }
    let principal = authenticator
        .authenticate(ctx.transport(), ctx.credentials())
        .map_err(|denied| RpcStatus::new(RpcCode::PermissionDenied, denied.error_id.to_string()))?;
    ctx.attach_principal(principal);
    Ok(())
}
