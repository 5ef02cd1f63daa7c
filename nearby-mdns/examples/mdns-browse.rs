use nearby_mdns::{url_finder, Callback, Service, ServiceDescription};
use std::net::IpAddr;

const FIRST_MDNS_TOKEN: usize = 0;

struct Printer;

impl Callback for Printer {
    fn on_host_found(&self, host_name: &str, addresses: &[IpAddr]) {
        println!("{host_name} -> {addresses:?}");
    }

    fn on_service_found(&self, service: &ServiceDescription) {
        println!(
            "{} ({}) on {}:{}",
            service.name(),
            service.service_type(),
            service.target(),
            service.port()
        );
        for url in url_finder::find_urls(service) {
            println!("  {url}");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut poll = mio::Poll::new()?;
    let mut events = mio::Events::with_capacity(128);

    let mut mdns = Service::new(poll.registry(), FIRST_MDNS_TOKEN, Printer)?;
    mdns.lookup_services([
        "_http._tcp",
        "_ipp._tcp",
        "_googlecast._tcp",
        "_ssh._tcp",
    ]);

    loop {
        poll.poll(&mut events, Some(mdns.next_timeout()))?;

        for event in &events {
            mdns.ready(event);
        }
        mdns.on_timeout();
    }
}
