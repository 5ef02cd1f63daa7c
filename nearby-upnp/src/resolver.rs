use crate::device::DeviceDescription;
use crate::scpd::ControlPointDescription;
use bitflags::bitflags;
use futures::future::{join_all, BoxFuture};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

bitflags! {
    /// What the pipeline fetches beyond the description document
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Behaviors: u32 {
        #[doc = "Fetch icon bytes into IconDescription::data"]
        const LOAD_ICONS = 1 << 0;

        #[doc = "Fetch and decode each service's SCPD document"]
        const LOAD_SERVICE_DESCRIPTION = 1 << 1;
    }
}

/// Why an HTTP fetch yielded no body
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The request never completed
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

/// The one HTTP operation the pipeline needs: GET a body
///
/// Implemented for [`reqwest::Client`]; tests substitute a fake.
pub trait HttpClient {
    /// Fetch `url`, resolving to the response body
    fn get(&self, url: &Url) -> BoxFuture<'static, Result<Vec<u8>, HttpError>>;
}

impl HttpClient for reqwest::Client {
    fn get(&self, url: &Url) -> BoxFuture<'static, Result<Vec<u8>, HttpError>> {
        let request = reqwest::Client::get(self, url.clone());
        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|e| HttpError::Transport(Box::new(e)))?;
            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status(status.as_u16()));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| HttpError::Transport(Box::new(e)))?;
            Ok(body.to_vec())
        })
    }
}

/// A callback made by the resolver when a device is fully assembled
pub trait Callback {
    /// A device description (with requested details) is complete
    fn on_device_found(&self, device: &DeviceDescription);
}

enum Detail {
    Icon(usize, Result<Vec<u8>, HttpError>),
    Scpd(usize, Result<Vec<u8>, HttpError>),
}

/// Turning SSDP notifications into aggregate device descriptions
///
/// Each location URL of a discovered service is fetched and decoded
/// into one or more [`DeviceDescription`] records; depending on the
/// configured [`Behaviors`], icons and SCPD documents referenced
/// from the description are fetched too (concurrently, relative to
/// the device's base URL). Sub-request failures leave the affected
/// field empty; the aggregate event always fires.
///
/// Without an HTTP client, a minimal record carrying only the
/// notification's URL, type, and unique device name is reported.
/// In-flight fetches are dropped with the resolver.
pub struct Resolver<CB: Callback> {
    client: Option<Arc<dyn HttpClient>>,
    behaviors: Behaviors,
    callback: CB,
}

impl<CB: Callback> Resolver<CB> {
    /// A resolver without an HTTP client (minimal records only)
    pub fn new(callback: CB) -> Self {
        Self {
            client: None,
            behaviors: Behaviors::empty(),
            callback,
        }
    }

    /// A resolver fetching descriptions (and more) via `client`
    pub fn with_client(
        callback: CB,
        client: Arc<dyn HttpClient>,
        behaviors: Behaviors,
    ) -> Self {
        Self {
            client: Some(client),
            behaviors,
            callback,
        }
    }

    /// The configured detail-loading behaviors
    #[must_use]
    pub fn behaviors(&self) -> Behaviors {
        self.behaviors
    }

    /// Change the detail-loading behaviors
    pub fn set_behaviors(&mut self, behaviors: Behaviors) {
        self.behaviors = behaviors;
    }

    /// Process one SSDP notification
    ///
    /// Fetches and reports every device described at each of the
    /// notification's locations, in order.
    pub async fn on_service_found(
        &self,
        service: &nearby_ssdp::ServiceDescription,
    ) {
        for location in &service.locations {
            match &self.client {
                None => {
                    debug!(
                        "reporting {} directly, no HTTP client configured",
                        service.name
                    );
                    self.callback.on_device_found(&DeviceDescription {
                        url: Some(location.clone()),
                        device_type: service.service_type.clone(),
                        unique_device_name: service.name.clone(),
                        ..DeviceDescription::default()
                    });
                }
                Some(client) => {
                    self.describe(client.as_ref(), location).await;
                }
            }
        }
    }

    async fn describe(&self, client: &dyn HttpClient, location: &Url) {
        debug!("downloading device description from <{location}>");
        let body = match client.get(location).await {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    "could not download device description from \
                     <{location}>: {e}"
                );
                return;
            }
        };

        let devices = match DeviceDescription::parse(&body, Some(location)) {
            Ok(devices) => devices,
            Err(e) => {
                warn!("ignoring device description from <{location}>: {e}");
                return;
            }
        };

        for mut device in devices {
            self.load_details(client, &mut device).await;
            self.callback.on_device_found(&device);
        }
    }

    async fn load_details(
        &self,
        client: &dyn HttpClient,
        device: &mut DeviceDescription,
    ) {
        let base = match device.base_url.clone().or_else(|| device.url.clone())
        {
            Some(base) => base,
            None => return,
        };

        let mut fetches: Vec<BoxFuture<'static, Detail>> = Vec::new();

        if self.behaviors.contains(Behaviors::LOAD_ICONS) {
            for (index, icon) in device.icons.iter().enumerate() {
                if icon.url.is_empty() || !icon.data.is_empty() {
                    continue;
                }
                match base.join(&icon.url) {
                    Ok(url) => {
                        let fetch = client.get(&url);
                        fetches.push(Box::pin(async move {
                            Detail::Icon(index, fetch.await)
                        }));
                    }
                    Err(e) => {
                        warn!("unusable icon URL {:?}: {e}", icon.url);
                    }
                }
            }
        }

        if self
            .behaviors
            .contains(Behaviors::LOAD_SERVICE_DESCRIPTION)
        {
            for (index, service) in device.services.iter().enumerate() {
                if service.scpd_url.is_empty() || service.scpd.is_some() {
                    continue;
                }
                match base.join(&service.scpd_url) {
                    Ok(url) => {
                        let fetch = client.get(&url);
                        fetches.push(Box::pin(async move {
                            Detail::Scpd(index, fetch.await)
                        }));
                    }
                    Err(e) => {
                        warn!(
                            "unusable SCPD URL {:?}: {e}",
                            service.scpd_url
                        );
                    }
                }
            }
        }

        for detail in join_all(fetches).await {
            match detail {
                Detail::Icon(index, Ok(data)) => {
                    if let Some(icon) = device.icons.get_mut(index) {
                        icon.data = data;
                    }
                }
                Detail::Scpd(index, Ok(body)) => {
                    match ControlPointDescription::parse(&body) {
                        Ok(scpd) => {
                            if let Some(service) =
                                device.services.get_mut(index)
                            {
                                service.scpd = Some(scpd);
                            }
                        }
                        Err(e) => {
                            warn!(
                                "ignoring SCPD for {}: {e}",
                                device.unique_device_name
                            );
                        }
                    }
                }
                Detail::Icon(_, Err(e)) | Detail::Scpd(_, Err(e)) => {
                    warn!(
                        "could not download detail for {}: {e}",
                        device.unique_device_name
                    );
                }
            }
        }
    }
}
