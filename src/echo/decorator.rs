//! Authenticating decorator around any [`EchoService`].

use crate::auth::{Authenticator, RequestContext};
use crate::echo::{EchoRequest, EchoResponse, EchoService, ServiceError};

/// Authenticates every request and only delegates the ones that pass.
///
/// Works the same on either transport, since it only looks at the
/// credentials the transport placed in the [`RequestContext`].
pub struct AuthDecorator<S> {
    delegate: S,
    authenticator: Authenticator,
}

impl<S: EchoService> AuthDecorator<S> {
    pub fn new(delegate: S, authenticator: Authenticator) -> Self {
        Self {
            delegate,
            authenticator,
        }
    }
}

impl<S: EchoService> EchoService for AuthDecorator<S> {
    fn echo(
        &self,
        ctx: &mut RequestContext,
        request: EchoRequest,
    ) -> Result<EchoResponse, ServiceError> {
        if ctx.principal().is_none() {
            let principal = self
                .authenticator
                .authenticate(ctx.transport(), ctx.credentials())
                .map_err(|denied| ServiceError::PermissionDenied {
                    error_id: denied.error_id,
                })?;
            ctx.attach_principal(principal);
        }
        self.delegate.echo(ctx, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BearerAuth, Credentials, Transport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Records the username it was called with.
    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        last_user: std::sync::Mutex<String>,
    }

    impl EchoService for Recorder {
        fn echo(
            &self,
            ctx: &mut RequestContext,
            request: EchoRequest,
        ) -> Result<EchoResponse, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_user.lock().unwrap() = ctx.username().to_string();
            crate::echo::EchoServer.echo(ctx, request)
        }
    }

    fn decorated(recorder: Arc<Recorder>) -> AuthDecorator<Arc<Recorder>> {
        let authenticator =
            Authenticator::new(Some(Arc::new(BearerAuth::from_pairs("alice:wibble"))), None);
        AuthDecorator::new(recorder, authenticator)
    }

    fn request() -> EchoRequest {
        EchoRequest {
            message: "hi".into(),
        }
    }

    #[test]
    fn authenticated_request_reaches_delegate_with_principal() {
        let recorder = Arc::new(Recorder::default());
        let service = decorated(recorder.clone());
        let mut ctx = RequestContext::new(
            Transport::Rpc,
            Credentials::new(None, Some("bearer wibble".into())),
        );

        service.echo(&mut ctx, request()).unwrap();
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*recorder.last_user.lock().unwrap(), "alice");
        assert_eq!(ctx.username(), "alice");
    }

    #[test]
    fn denied_request_never_reaches_delegate() {
        let recorder = Arc::new(Recorder::default());
        let service = decorated(recorder.clone());
        let mut ctx = RequestContext::new(
            Transport::Http,
            Credentials::new(None, Some("bearer nope".into())),
        );

        let err = service.echo(&mut ctx, request()).unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
        assert!(ctx.principal().is_none());
    }

    #[test]
    fn already_authenticated_context_is_left_alone() {
        let recorder = Arc::new(Recorder::default());
        let service = decorated(recorder.clone());
        let mut ctx = RequestContext::new(Transport::Rpc, Credentials::default());
        ctx.attach_principal(crate::auth::Principal::new("server.example.com"));

        service.echo(&mut ctx, request()).unwrap();
        assert_eq!(*recorder.last_user.lock().unwrap(), "server.example.com");
    }
}
