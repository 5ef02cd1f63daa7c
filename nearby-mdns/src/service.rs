use crate::resolver::{Callback, Resolver, DEFAULT_SCAN_INTERVAL};
use crate::message::Message;
use nearby_core::udp::mio::MioSocketFactory;
use nearby_core::ScanTimer;
use std::time::Duration;
use tracing::warn;

/// A ready-to-run mDNS resolver wired to a mio poll
///
/// The owner runs the event loop: poll with a timeout of
/// [`Service::next_timeout`], call [`Service::ready`] for every
/// event whose token belongs to this service, and
/// [`Service::on_timeout`] once the poll times out.
pub struct Service<CB: Callback> {
    resolver: Resolver<CB, MioSocketFactory>,
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
            resolver: Resolver::new(callback, factory),
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

    /// Access the resolver, e.g. to change the domain
    pub fn resolver_mut(&mut self) -> &mut Resolver<CB, MioSocketFactory> {
        &mut self.resolver
    }

    /// Look up the addresses of one or more host names
    pub fn lookup_host_names<'a, I>(&mut self, host_names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.resolver.lookup_host_names(host_names)
    }

    /// Look up the instances of one or more service types
    pub fn lookup_services<'a, I>(&mut self, service_types: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.resolver.lookup_services(service_types)
    }

    /// Submit a raw query message
    pub fn lookup(&mut self, message: &Message) -> bool {
        self.resolver.lookup(message)
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
