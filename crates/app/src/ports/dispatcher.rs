//! Service dispatcher port — issues commands to host entities.

use std::future::Future;
use std::sync::Arc;

use controllable_domain::error::ControllableError;
use controllable_domain::service::ServiceCall;

/// Forwards service calls to the host.
///
/// Completion only means the host accepted the call; the target may apply
/// it later and report the change through a `state_changed` event.
pub trait ServiceDispatcher {
    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), ControllableError>> + Send;
}

impl<T: ServiceDispatcher + Send + Sync> ServiceDispatcher for Arc<T> {
    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), ControllableError>> + Send {
        (**self).call_service(call)
    }
}
