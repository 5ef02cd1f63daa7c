use crate::resolver::{
    Callback, Resolver, ServiceLookupRequest, DEFAULT_SCAN_INTERVAL,
};
use nearby_core::udp::mio::MioSocketFactory;
use nearby_core::{ScanTimer, SystemClock};
use std::time::Duration;
use tracing::warn;

/// A ready-to-run SSDP resolver wired to a mio poll
///
/// The owner runs the event loop: poll with a timeout of
/// [`Service::next_timeout`], call [`Service::ready`] for every
/// event whose token belongs to this service, and
/// [`Service::on_timeout`] once the poll times out.
pub struct Service<CB: Callback> {
    resolver: Resolver<CB, SystemClock, MioSocketFactory>,
    timer: ScanTimer,
}

impl<CB: Callback> Service<CB> {
    /// Create a service registering its sockets with `registry`
    ///
    /// Socket tokens are allocated from `first_token` upwards; the
    /// caller must not use that range for anything else. The first
    /// interface scan happens immediately.
    ///
    /// # Errors
    ///
    /// Passes on errors from cloning the poll registry.
    pub fn new(
        registry: &mio::Registry,
        first_token: usize,
        callback: CB,
    ) -> Result<Self, std::io::Error> {
        let factory = MioSocketFactory::new(registry, first_token)?;
        let mut service = Self {
            resolver: Resolver::new(callback, SystemClock, factory),
            timer: ScanTimer::new(DEFAULT_SCAN_INTERVAL),
        };
        service.scan();
        service.timer.update();
        Ok(service)
    }

    /// The interval between scans
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        self.timer.interval()
    }

    /// Change the interval between scans
    pub fn set_scan_interval(&mut self, interval: Duration) {
        self.timer.set_interval(interval);
    }

    /// Search for a service type with default delays
    pub fn lookup_service(&mut self, service_type: &str) -> bool {
        self.resolver.lookup_service(service_type)
    }

    /// Search for a service type
    pub fn lookup(&mut self, request: &ServiceLookupRequest) -> bool {
        self.resolver.lookup(request)
    }

    /// How long the owner should poll before the next scan
    #[must_use]
    pub fn next_timeout(&self) -> Duration {
        self.timer.next_due()
    }

    /// Called when the poll timeout expires
    pub fn on_timeout(&mut self) {
        if self.timer.next_due().is_zero() {
            self.scan();
            self.timer.update();
        }
    }

    /// Called for every mio event belonging to this service
    pub fn ready(&mut self, event: &mio::event::Event) {
        if !event.is_readable() {
            return;
        }
        if let Some(address) =
            self.resolver.factory().address_for(event.token())
        {
            self.resolver.on_ready(&address);
        }
    }

    fn scan(&mut self) {
        match nearby_netif::get_interfaces() {
            Ok(interfaces) => self.resolver.on_scan(&interfaces),
            Err(e) => warn!("could not enumerate interfaces: {e}"),
        }
    }
}
