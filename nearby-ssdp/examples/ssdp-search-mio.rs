use nearby_ssdp::{Callback, Service, ServiceDescription, SEARCH_ALL};
use std::cell::RefCell;
use std::collections::HashSet;

const FIRST_SSDP_TOKEN: usize = 0;

struct Printer {
    seen: RefCell<HashSet<String>>,
}

impl Callback for Printer {
    fn on_service_found(&self, service: &ServiceDescription) {
        if self.seen.borrow_mut().insert(service.name.clone()) {
            println!("+ {}", service.service_type);
            println!("  {}", service.name);
            for location in &service.locations {
                println!("  at {location}");
            }
            if let Some(expires) = service.expires {
                println!("  until {expires}");
            }
        }
    }

    fn on_service_lost(&self, unique_service_name: &str) {
        if self.seen.borrow_mut().remove(unique_service_name) {
            println!("- {unique_service_name}");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut poll = mio::Poll::new()?;
    let mut events = mio::Events::with_capacity(128);

    let mut ssdp = Service::new(
        poll.registry(),
        FIRST_SSDP_TOKEN,
        Printer {
            seen: RefCell::new(HashSet::new()),
        },
    )?;
    ssdp.lookup_service(SEARCH_ALL);

    loop {
        poll.poll(&mut events, Some(ssdp.next_timeout()))?;

        for event in &events {
            ssdp.ready(event);
        }
        ssdp.on_timeout();
    }
}
