use super::*;
use nix::ifaddrs;
use nix::net::if_::InterfaceFlags;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

/** Obtain the current list of network interfaces
 *
 * Returns one [`InterfaceDescription`] per interface, each carrying
 * all of that interface's addresses (an interface may have several,
 * both IPv4 and IPv6). Linux interface aliases ("eth0:1") are folded
 * into their base interface.
 *
 * The result is a snapshot; callers wanting to track changes should
 * simply call this again and diff the results, which is what the
 * discovery resolvers do on their periodic scan.
 *
 * ```rust
 * # use nearby_netif::*;
 * for iface in get_interfaces()? {
 *     println!("{} {:?} {:?}", iface.name, iface.kind, iface.flags);
 *     for address in &iface.addresses {
 *         println!("  {}/{}", address.ip, address.prefix_length);
 *     }
 * }
 * # Ok::<(), std::io::Error>(())
 * ```
 *
 * # Errors
 *
 * Passes on any error from the underlying getifaddrs(3) call.
 */
pub fn get_interfaces() -> Result<Vec<InterfaceDescription>, std::io::Error> {
    get_interfaces_inner(ifaddrs::getifaddrs)
}

fn get_interfaces_inner(
    getifaddrs: fn() -> nix::Result<ifaddrs::InterfaceAddressIterator>,
) -> Result<Vec<InterfaceDescription>, std::io::Error> {
    Ok(collect_interfaces(getifaddrs()?))
}

/** Fold the per-address results of getifaddrs into per-interface records
 */
fn collect_interfaces<ITER>(iter: ITER) -> Vec<InterfaceDescription>
where
    ITER: Iterator<Item = ifaddrs::InterfaceAddress>,
{
    let mut interfaces = Vec::new();
    let mut index_map = HashMap::new();

    for ifaddr in iter {
        /* Undo Linux aliasing: "eth0:1" is "eth0" really. */
        let name = match ifaddr.interface_name.split_once(':') {
            None => ifaddr.interface_name.clone(),
            Some((prefix, _alias)) => prefix.to_string(),
        };

        let slot = match index_map.entry(name) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let slot = interfaces.len();
                let index = InterfaceIndex(slot as u32 + 1);
                let name = e.key().clone();
                let flags = map_interface_flags(&ifaddr.flags);
                e.insert(slot);
                interfaces.push(InterfaceDescription {
                    index,
                    kind: classify(&name, flags),
                    name,
                    flags,
                    addresses: Vec::new(),
                });
                slot
            }
        };

        if let Some(address) = map_address(&ifaddr) {
            if !interfaces[slot].addresses.contains(&address) {
                interfaces[slot].addresses.push(address);
            }
        }
    }

    interfaces
}

fn map_address(ifaddr: &ifaddrs::InterfaceAddress) -> Option<Address> {
    let addr = ifaddr.address.as_ref()?;
    let mask = ifaddr.netmask.as_ref()?;

    if let Some(ipv4) = addr.as_sockaddr_in() {
        let netmask = mask.as_sockaddr_in()?;
        Some(Address {
            ip: IpAddr::from(Ipv4Addr::from(ipv4.ip())),
            prefix_length: netmask.ip().leading_ones() as u8,
        })
    } else if let Some(ipv6) = addr.as_sockaddr_in6() {
        let netmask = mask.as_sockaddr_in6()?;
        Some(Address {
            ip: IpAddr::from(ipv6.ip()),
            prefix_length: u128::from_be_bytes(
                netmask.as_ref().sin6_addr.s6_addr,
            )
            .leading_ones() as u8,
        })
    } else {
        None
    }
}

fn map_interface_flags(flags: &InterfaceFlags) -> Flags {
    let mut newflags = Default::default();
    for (iff, newf) in [
        (InterfaceFlags::IFF_UP, Flags::UP),
        (InterfaceFlags::IFF_RUNNING, Flags::RUNNING),
        (InterfaceFlags::IFF_LOOPBACK, Flags::LOOPBACK),
        (InterfaceFlags::IFF_POINTOPOINT, Flags::POINTTOPOINT),
        (InterfaceFlags::IFF_BROADCAST, Flags::BROADCAST),
        (InterfaceFlags::IFF_MULTICAST, Flags::MULTICAST),
    ] {
        if flags.contains(iff) {
            newflags |= newf;
        }
    }
    newflags
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;
    use std::net::SocketAddrV4;
    use std::net::SocketAddrV6;

    #[test]
    fn flag_up() {
        assert_eq!(map_interface_flags(&InterfaceFlags::IFF_UP), Flags::UP);
    }

    #[test]
    fn flag_running() {
        assert_eq!(
            map_interface_flags(&InterfaceFlags::IFF_RUNNING),
            Flags::RUNNING
        );
    }

    #[test]
    fn flag_loopback() {
        assert_eq!(
            map_interface_flags(&InterfaceFlags::IFF_LOOPBACK),
            Flags::LOOPBACK
        );
    }

    #[test]
    fn flag_p2p() {
        assert_eq!(
            map_interface_flags(&InterfaceFlags::IFF_POINTOPOINT),
            Flags::POINTTOPOINT
        );
    }

    #[test]
    fn flag_broadcast() {
        assert_eq!(
            map_interface_flags(&InterfaceFlags::IFF_BROADCAST),
            Flags::BROADCAST
        );
    }

    #[test]
    fn flag_multicast() {
        assert_eq!(
            map_interface_flags(&InterfaceFlags::IFF_MULTICAST),
            Flags::MULTICAST
        );
    }

    fn test_iter(
        ifaddrs: &[ifaddrs::InterfaceAddress],
    ) -> impl Iterator<Item = ifaddrs::InterfaceAddress> {
        ifaddrs.to_vec().into_iter()
    }

    fn eth0_v4() -> ifaddrs::InterfaceAddress {
        let addr = SocketAddrV4::new(Ipv4Addr::new(192, 168, 100, 1), 80);
        let mask = SocketAddrV4::new(Ipv4Addr::new(255, 255, 255, 0), 80);

        ifaddrs::InterfaceAddress {
            interface_name: "eth0".to_string(),
            flags: InterfaceFlags::IFF_UP | InterfaceFlags::IFF_MULTICAST,
            address: Some(addr.into()),
            netmask: Some(mask.into()),
            broadcast: None,
            destination: None,
        }
    }

    #[test]
    fn new_ipv4() {
        let interfaces = collect_interfaces(test_iter(&[eth0_v4()]));

        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].index, InterfaceIndex(1));
        assert_eq!(interfaces[0].name, "eth0");
        assert_eq!(interfaces[0].kind, Kind::Ethernet);
        assert_eq!(interfaces[0].flags, Flags::UP | Flags::MULTICAST);
        assert_eq!(
            interfaces[0].addresses,
            vec![Address {
                ip: Ipv4Addr::new(192, 168, 100, 1).into(),
                prefix_length: 24,
            }]
        );
    }

    #[test]
    fn missing_netmask_skips_address() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(169, 254, 99, 99), 80);

        let ifaddr2 = ifaddrs::InterfaceAddress {
            interface_name: "eth0:1".to_string(),
            flags: InterfaceFlags::IFF_UP,
            address: Some(addr.into()),
            netmask: None, //<-- that won't work then
            broadcast: None,
            destination: None,
        };

        let interfaces = collect_interfaces(test_iter(&[eth0_v4(), ifaddr2]));

        assert_eq!(interfaces.len(), 1); // alias folded into eth0
        assert_eq!(interfaces[0].addresses.len(), 1); // no second address
    }

    #[test]
    fn ipv4_alias_folded() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(169, 254, 99, 99), 80);
        let mask = SocketAddrV4::new(Ipv4Addr::new(255, 255, 0, 0), 80);

        let ifaddr2 = ifaddrs::InterfaceAddress {
            interface_name: "eth0:1".to_string(),
            flags: InterfaceFlags::IFF_UP,
            address: Some(addr.into()),
            netmask: Some(mask.into()),
            broadcast: None,
            destination: None,
        };

        let interfaces = collect_interfaces(test_iter(&[eth0_v4(), ifaddr2]));

        assert_eq!(interfaces.len(), 1);
        assert_eq!(
            interfaces[0].addresses,
            vec![
                Address {
                    ip: Ipv4Addr::new(192, 168, 100, 1).into(),
                    prefix_length: 24,
                },
                Address {
                    ip: Ipv4Addr::new(169, 254, 99, 99).into(),
                    prefix_length: 16,
                },
            ]
        );
    }

    #[test]
    fn two_interfaces() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(169, 254, 99, 99), 80);
        let mask = SocketAddrV4::new(Ipv4Addr::new(255, 255, 0, 0), 80);

        let ifaddr2 = ifaddrs::InterfaceAddress {
            interface_name: "wlan0".to_string(),
            flags: InterfaceFlags::IFF_UP | InterfaceFlags::IFF_RUNNING,
            address: Some(addr.into()),
            netmask: Some(mask.into()),
            broadcast: None,
            destination: None,
        };

        let interfaces = collect_interfaces(test_iter(&[eth0_v4(), ifaddr2]));

        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[1].index, InterfaceIndex(2));
        assert_eq!(interfaces[1].name, "wlan0");
        assert_eq!(interfaces[1].kind, Kind::Wireless);
        assert_eq!(interfaces[1].flags, Flags::UP | Flags::RUNNING);
    }

    #[test]
    fn ipv4_and_ipv6_on_one_interface() {
        let addr = SocketAddrV6::new(
            Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1),
            80,
            0,
            0,
        );
        let mask = SocketAddrV6::new(
            Ipv6Addr::new(0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0, 0, 0, 0),
            80,
            0,
            0,
        );

        let ifaddr2 = ifaddrs::InterfaceAddress {
            interface_name: "eth0".to_string(),
            flags: InterfaceFlags::IFF_UP | InterfaceFlags::IFF_MULTICAST,
            address: Some(addr.into()),
            netmask: Some(mask.into()),
            broadcast: None,
            destination: None,
        };

        let interfaces = collect_interfaces(test_iter(&[eth0_v4(), ifaddr2]));

        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].addresses.len(), 2);
        assert_eq!(
            interfaces[0].addresses[1],
            Address {
                ip: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1).into(),
                prefix_length: 64,
            }
        );
    }

    #[test]
    fn mismatched_masks_skip_addresses() {
        let addr4 = SocketAddrV4::new(Ipv4Addr::new(192, 168, 100, 1), 80);
        let mask4 = SocketAddrV4::new(Ipv4Addr::new(255, 255, 255, 0), 80);

        let addr6 = SocketAddrV6::new(
            Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
            80,
            0,
            0,
        );
        let mask6 = SocketAddrV6::new(
            Ipv6Addr::new(0xFFFF, 0xFFFF, 0, 0, 0, 0, 0, 0),
            80,
            0,
            0,
        );

        let ifaddr = ifaddrs::InterfaceAddress {
            interface_name: "eth0".to_string(),
            flags: InterfaceFlags::IFF_UP,
            address: Some(addr4.into()),
            netmask: Some(mask6.into()), // note mismatch
            broadcast: None,
            destination: None,
        };

        let ifaddr2 = ifaddrs::InterfaceAddress {
            interface_name: "eth0".to_string(),
            flags: InterfaceFlags::IFF_UP,
            address: Some(addr6.into()),
            netmask: Some(mask4.into()), // note mismatch
            broadcast: None,
            destination: None,
        };

        let interfaces = collect_interfaces(test_iter(&[ifaddr, ifaddr2]));

        assert_eq!(interfaces.len(), 1);
        assert!(interfaces[0].addresses.is_empty());
    }

    #[test]
    fn get_interfaces_passes_through_errors() {
        let s = get_interfaces_inner(|| Err(nix::errno::Errno::ENOTTY));
        assert!(s.is_err());
    }

    #[test]
    fn zzz_instantiate() {
        assert!(get_interfaces().is_ok());
    }
}
