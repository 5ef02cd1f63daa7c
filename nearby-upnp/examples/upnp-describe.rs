//! Search for UPnP root devices, then fetch and print their
//! descriptions.
//!
//! Runs in two phases: a mio loop collects SSDP notifications for a
//! few seconds, then a tokio runtime drives the HTTP fetch pipeline
//! for everything found.

use nearby_upnp::{Behaviors, DeviceDescription};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FIRST_SSDP_TOKEN: usize = 0;
const SEARCH_WINDOW: Duration = Duration::from_secs(10);

struct Collector {
    found: Rc<RefCell<HashMap<String, nearby_ssdp::ServiceDescription>>>,
}

impl nearby_ssdp::Callback for Collector {
    fn on_service_found(&self, service: &nearby_ssdp::ServiceDescription) {
        self.found
            .borrow_mut()
            .entry(service.name.clone())
            .or_insert_with(|| service.clone());
    }
}

struct Printer;

impl nearby_upnp::Callback for Printer {
    fn on_device_found(&self, device: &DeviceDescription) {
        println!(
            "{} ({})",
            if device.display_name.is_empty() {
                &device.unique_device_name
            } else {
                &device.display_name
            },
            device.device_type
        );
        if !device.model.name.is_empty() {
            println!(
                "  {} {} by {}",
                device.model.name, device.model.number,
                device.manufacturer.name
            );
        }
        for icon in &device.icons {
            println!(
                "  icon {}x{} {} ({} bytes)",
                icon.width,
                icon.height,
                icon.mime_type,
                icon.data.len()
            );
        }
        for service in &device.services {
            let actions = service
                .scpd
                .as_ref()
                .map(|scpd| scpd.actions.len())
                .unwrap_or(0);
            println!("  service {} ({actions} actions)", service.service_type);
        }
    }
}

fn collect_services(
) -> Result<Vec<nearby_ssdp::ServiceDescription>, Box<dyn std::error::Error>>
{
    let found = Rc::new(RefCell::new(HashMap::new()));

    let mut poll = mio::Poll::new()?;
    let mut events = mio::Events::with_capacity(128);
    let mut ssdp = nearby_ssdp::Service::new(
        poll.registry(),
        FIRST_SSDP_TOKEN,
        Collector {
            found: found.clone(),
        },
    )?;
    ssdp.lookup_service("upnp:rootdevice");

    let deadline = Instant::now() + SEARCH_WINDOW;
    while Instant::now() < deadline {
        let timeout = ssdp
            .next_timeout()
            .min(deadline.saturating_duration_since(Instant::now()));
        poll.poll(&mut events, Some(timeout))?;

        for event in &events {
            ssdp.ready(event);
        }
        ssdp.on_timeout();
    }

    let found = found.borrow();
    Ok(found.values().cloned().collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("searching for {SEARCH_WINDOW:?}...");
    let services = collect_services()?;
    println!("{} devices answered", services.len());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let resolver = nearby_upnp::Resolver::with_client(
            Printer,
            Arc::new(reqwest::Client::new()),
            Behaviors::LOAD_ICONS | Behaviors::LOAD_SERVICE_DESCRIPTION,
        );
        for service in &services {
            resolver.on_service_found(service).await;
        }
    });

    Ok(())
}
