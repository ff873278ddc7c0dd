//! Gateway façade implementing the [`DeviceGateway`] driving port.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{Instrument, info_span};

use crate::domain::Error;
use crate::domain::envelope::WireEnvelope;
use crate::domain::ports::{
    DeviceDirectory, DeviceGateway, DeviceStateRepository, GatewayOperation, GatewayRequest,
};

use super::authentication::RequestAuthenticator;
use super::protocol::DeviceProtocolService;
use super::response::ResponseSealer;

/// Runs the full pipeline for each device request.
///
/// # Examples
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use mockable::DefaultClock;
/// # use tracker_backend::domain::DeviceGatewayService;
/// # use tracker_backend::outbound::memory::InMemoryDeviceStore;
/// let store = Arc::new(InMemoryDeviceStore::default());
/// let gateway = DeviceGatewayService::new(store.clone(), store, Arc::new(DefaultClock));
/// # let _ = gateway;
/// ```
pub struct DeviceGatewayService<D, S> {
    authenticator: RequestAuthenticator<D>,
    protocol: DeviceProtocolService<S>,
    sealer: ResponseSealer,
}

impl<D, S> Clone for DeviceGatewayService<D, S> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            protocol: self.protocol.clone(),
            sealer: self.sealer,
        }
    }
}

impl<D, S> DeviceGatewayService<D, S>
where
    D: DeviceDirectory,
    S: DeviceStateRepository,
{
    pub fn new(directory: Arc<D>, state: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            authenticator: RequestAuthenticator::new(directory),
            protocol: DeviceProtocolService::new(state, clock),
            sealer: ResponseSealer,
        }
    }

    async fn dispatch(&self, request: GatewayRequest) -> Result<WireEnvelope, Error> {
        let GatewayRequest {
            device_id,
            operation,
        } = request;
        match operation {
            GatewayOperation::ReportLocation(fields) => {
                let authenticated = self.authenticator.authenticate(&device_id, &fields).await?;
                let response = self.protocol.ingest_location(&authenticated).await?;
                self.sealer.seal(&response, Some(&authenticated.key))
            }
            GatewayOperation::PollCommand => {
                let identified = self.authenticator.identify(&device_id).await?;
                let response = self.protocol.deliver_command(&identified.device).await?;
                self.sealer.seal(&response, Some(&identified.key))
            }
            GatewayOperation::PollConfiguration => {
                let identified = self.authenticator.identify(&device_id).await?;
                let response = self
                    .protocol
                    .synchronise_configuration(&identified.device)
                    .await?;
                self.sealer.seal(&response, Some(&identified.key))
            }
            GatewayOperation::CheckConfiguration => {
                let identified = self.authenticator.identify(&device_id).await?;
                let response = self.protocol.check_configuration(&identified.device);
                self.sealer.seal(&response, Some(&identified.key))
            }
        }
    }
}

fn operation_name(operation: &GatewayOperation) -> &'static str {
    match operation {
        GatewayOperation::ReportLocation(_) => "report_location",
        GatewayOperation::PollCommand => "poll_command",
        GatewayOperation::PollConfiguration => "poll_configuration",
        GatewayOperation::CheckConfiguration => "check_configuration",
    }
}

#[async_trait]
impl<D, S> DeviceGateway for DeviceGatewayService<D, S>
where
    D: DeviceDirectory,
    S: DeviceStateRepository,
{
    async fn handle(&self, request: GatewayRequest) -> Result<WireEnvelope, Error> {
        let span = info_span!(
            "device_request",
            device_id = %request.device_id,
            operation = operation_name(&request.operation),
        );
        self.dispatch(request).instrument(span).await
    }
}
