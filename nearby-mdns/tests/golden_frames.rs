//! Decoding captured mDNS frames, field by field
//!
//! The frames are real captures from Chromecast and Android TV
//! devices; between them they exercise compression pointers in
//! questions, answers, and SRV targets, reverse-lookup names, and
//! record types we only skip over (NSEC).

use bytes::Bytes;
use nearby_mdns::message::{Message, NetworkClass, Resource};
use std::net::IpAddr;

fn frame(hex: &str) -> Message {
    Message::from_bytes(Bytes::from(
        hex::decode(hex.replace([' ', '\n'], "")).expect("valid hex"),
    ))
}

enum Detail {
    Address(&'static str),
    Pointer(&'static str),
    Service(u16, u16, u16, &'static str),
    Text(usize),
    Skipped,
}

struct Expected {
    name: &'static str,
    rtype: u16,
    flush: bool,
    ttl: u32,
    detail: Detail,
}

fn check_resource(index: usize, resource: &Resource, expected: &Expected) {
    assert_eq!(
        resource.name().to_dotted(),
        expected.name,
        "record {index} name"
    );
    assert_eq!(resource.raw_type(), expected.rtype, "record {index} type");
    assert_eq!(
        resource.raw_class(),
        NetworkClass::In as u16,
        "record {index} class"
    );
    assert_eq!(resource.flush(), expected.flush, "record {index} flush");
    assert_eq!(resource.ttl(), expected.ttl, "record {index} ttl");

    match expected.detail {
        Detail::Address(address) => {
            assert_eq!(
                resource.address(),
                Some(address.parse::<IpAddr>().unwrap()),
                "record {index} address"
            );
        }
        Detail::Pointer(target) => {
            assert_eq!(
                resource.pointer().expect("pointer").to_dotted(),
                target,
                "record {index} pointer"
            );
        }
        Detail::Service(priority, weight, port, target) => {
            let service = resource.service().expect("service");
            assert_eq!(service.priority(), priority);
            assert_eq!(service.weight(), weight);
            assert_eq!(service.port(), port, "record {index} port");
            assert_eq!(service.target().to_dotted(), target);
        }
        Detail::Text(length) => {
            assert_eq!(
                resource.text().expect("text").len(),
                length,
                "record {index} text length"
            );
        }
        Detail::Skipped => {
            assert!(resource.address().is_none());
            assert!(resource.pointer().is_none());
            assert!(resource.service().is_none());
            assert!(resource.text().is_none());
        }
    }
}

#[test]
fn googlecast_query_with_compressed_question() {
    let message = frame(
        "001e 0000
         0002 0000 0000 0000
         2a 5f25394535453743 3846343739383935 3236433942434439
            3544323430383446 3646304232374335 4544
         04 5f737562
         0b 5f676f6f676c6563 617374
         04 5f746370
         05 6c6f63616c
         00
         000c 0001
         c03c
         000c 0001",
    );

    assert_eq!(message.serial(), 30);
    assert!(message.is_query());
    assert_eq!(message.question_count(), 2);
    assert_eq!(message.answer_count(), 0);
    assert_eq!(message.authority_count(), 0);
    assert_eq!(message.additional_count(), 0);

    let q0 = message.question(0).unwrap();
    assert_eq!(
        q0.name().to_dotted(),
        "_%9E5E7C8F47989526C9BCD95D24084F6F0B27C5ED._sub._googlecast.\
         _tcp.local."
    );
    assert_eq!(q0.raw_type(), 12);
    assert_eq!(q0.raw_class(), 1);
    assert!(!q0.unicast_response());

    let q1 = message.question(1).unwrap();
    assert_eq!(q1.name().to_dotted(), "_googlecast._tcp.local.");
    assert_eq!(q1.raw_type(), 12);
    assert!(message.question(2).is_none());
}

#[test]
fn googlecast_simple_query() {
    let message = frame(
        "0000 0000
         0001 0000 0000 0000
         0b 5f676f6f676c6563 617374
         04 5f746370
         05 6c6f63616c
         00
         000c 0001",
    );

    assert_eq!(message.question_count(), 1);
    let q = message.question(0).unwrap();
    assert_eq!(q.name().to_dotted(), "_googlecast._tcp.local.");
}

#[test]
fn googlecast_response() {
    let message = frame(
        "0000 8400
         0000 0001 0000 0003
         0b 5f676f6f676c6563 617374
         04 5f746370
         05 6c6f63616c
         00
         000c 0001 00000078 0030
         2d 4252415649412d34 4b2d47422d346133 6365653731643366
            3766383032396232 3461323662393032 6439373831
         c00c
         c02e
         0010 8001 00001194 00aa
         2369643d34613363 6565373164336637 6638303239623234 6132366239303264
         393738312363643d 4632363543313338 3534314542303130 4338423638384430
         4142444246323637 03726d3d0576653d 30350f6d643d4252 4156494120344b20
         47421269633d2f73 657475702f69636f 6e2e706e670e666e 3d4b442d35355844
         383030350763613d 323035330473743d 300f62733d464138 4644303930453041
         31046e663d310372 733d
         c02e
         0021 8001 00000078 002d
         0000 0000 1f49
         24 3461336365653731 2d643366372d6638 30322d396232342d
            6132366239303264 39373831
         c01d
         c126
         0001 8001 00000078 0004
         c0a8b23c",
    );

    assert_eq!(message.serial(), 0);
    assert!(message.is_response());
    assert!(message.is_authoritative());
    assert_eq!(message.question_count(), 0);
    assert_eq!(message.answer_count(), 1);
    assert_eq!(message.authority_count(), 0);
    assert_eq!(message.additional_count(), 3);

    let expected = [
        Expected {
            name: "_googlecast._tcp.local.",
            rtype: 12,
            flush: false,
            ttl: 120,
            detail: Detail::Pointer(
                "BRAVIA-4K-GB-4a3cee71d3f7f8029b24a26b902d9781.\
                 _googlecast._tcp.local.",
            ),
        },
        Expected {
            name: "BRAVIA-4K-GB-4a3cee71d3f7f8029b24a26b902d9781.\
                   _googlecast._tcp.local.",
            rtype: 16,
            flush: true,
            ttl: 4500,
            detail: Detail::Text(170),
        },
        Expected {
            name: "BRAVIA-4K-GB-4a3cee71d3f7f8029b24a26b902d9781.\
                   _googlecast._tcp.local.",
            rtype: 33,
            flush: true,
            ttl: 120,
            detail: Detail::Service(
                0,
                0,
                8009,
                "4a3cee71-d3f7-f802-9b24-a26b902d9781.local.",
            ),
        },
        Expected {
            name: "4a3cee71-d3f7-f802-9b24-a26b902d9781.local.",
            rtype: 1,
            flush: true,
            ttl: 120,
            detail: Detail::Address("192.168.178.60"),
        },
    ];

    let records: Vec<_> = message.responses().collect();
    assert_eq!(records.len(), expected.len());
    for (i, (resource, expected)) in
        records.iter().zip(expected.iter()).enumerate()
    {
        check_resource(i, resource, expected);
    }
}

#[test]
fn androidtv_query_with_known_answers() {
    let message = frame(
        "0000 0000
         0004 0000 0004 0000
         13 6164622d35346134 3166303136303031 313233
         04 5f616462
         04 5f746370
         05 6c6f63616c
         00
         00ff 0001
         0b 4b442d3535584438 303035
         10 5f616e64726f6964 747672656d6f7465
         c025
         00ff 0001
         07 416e64726f6964
         c02a
         00ff 0001
         c058
         00ff 0001
         c00c
         0021 0001 00000078 0008
         0000 0000 15b3
         c058
         c035
         0021 0001 00000078 0008
         0000 0000 1942
         c058
         c058
         0001 0001 00000078 0004
         c0a8b23c
         c058
         001c 0001 00000078 0010
         fe80000000000000124fa8fffe86d528",
    );

    assert_eq!(message.question_count(), 4);
    assert_eq!(message.answer_count(), 0);
    assert_eq!(message.authority_count(), 4);
    assert_eq!(message.additional_count(), 0);

    let names: Vec<_> = message
        .questions()
        .map(|q| q.name().to_dotted())
        .collect();
    assert_eq!(
        names,
        vec![
            "adb-54a41f016001123._adb._tcp.local.".to_string(),
            "KD-55XD8005._androidtvremote._tcp.local.".to_string(),
            "Android.local.".to_string(),
            "Android.local.".to_string(),
        ]
    );
    assert!(message.questions().all(|q| q.raw_type() == 255));

    let expected = [
        Expected {
            name: "adb-54a41f016001123._adb._tcp.local.",
            rtype: 33,
            flush: false,
            ttl: 120,
            detail: Detail::Service(0, 0, 5555, "Android.local."),
        },
        Expected {
            name: "KD-55XD8005._androidtvremote._tcp.local.",
            rtype: 33,
            flush: false,
            ttl: 120,
            detail: Detail::Service(0, 0, 6466, "Android.local."),
        },
        Expected {
            name: "Android.local.",
            rtype: 1,
            flush: false,
            ttl: 120,
            detail: Detail::Address("192.168.178.60"),
        },
        Expected {
            name: "Android.local.",
            rtype: 28,
            flush: false,
            ttl: 120,
            detail: Detail::Address("fe80::124f:a8ff:fe86:d528"),
        },
    ];

    let records: Vec<_> = message.responses().collect();
    assert_eq!(records.len(), expected.len());
    for (i, (resource, expected)) in
        records.iter().zip(expected.iter()).enumerate()
    {
        check_resource(i, resource, expected);
    }
}

#[test]
fn androidtv_response_with_nsec_and_reverse_names() {
    let message = frame(
        "0000 8400
         0000 000c 0000 0005
         13 6164622d35346134 3166303136303031 313233
         04 5f616462
         04 5f746370
         05 6c6f63616c
         00
         0010 8001 00001194 0001
         00
         09 5f73657276696365 73
         07 5f646e732d7364
         04 5f756470
         c02a
         000c 0001 00001194 0002
         c020
         c020
         000c 0001 00001194 0002
         c00c
         c00c
         0021 8001 00000078 0010
         0000 0000 15b3
         07 416e64726f6964
         c02a
         0b 4b442d3535584438 303035
         10 5f616e64726f6964 747672656d6f7465
         c025
         0010 8001 00001194 0015
         1462743d34343a31 433a41383a37463a 31423a3632
         c03c
         000c 0001 00001194 0002
         c097
         c097
         000c 0001 00001194 0002
         c08b
         c08b
         0021 8001 00000078 0008
         0000 0000 1942
         c081
         02 3630
         03 313738
         03 313638
         03 313932
         07 696e2d61646472
         04 61727061
         00
         000c 8001 00000078 0002
         c081
         01 38 01 32 01 35 01 44
         01 36 01 38 01 45 01 46
         01 46 01 46 01 38 01 41
         01 46 01 34 01 32 01 31
         01 30 01 30 01 30 01 30
         01 30 01 30 01 30 01 30
         01 30 01 30 01 30 01 30
         01 30 01 38 01 45 01 46
         03 697036
         c110
         000c 8001 00000078 0002
         c081
         c081
         0001 8001 00000078 0004
         c0a8b23c
         c081
         001c 8001 00000078 0010
         fe80 0000 0000 0000 124f a8ff fe86 d528
         c00c
         002f 8001 00001194 0009
         c00c 00 05 0000800040
         c08b
         002f 8001 00001194 0009
         c08b 00 05 0000800040
         c0f9
         002f 8001 00000078 0006
         c0f9 00 02 0008
         c122
         002f 8001 00000078 0006
         c122 00 02 0008
         c081
         002f 8001 00000078 0008
         c081 00 04 40000008",
    );

    assert!(message.is_response());
    assert_eq!(message.question_count(), 0);
    assert_eq!(message.answer_count(), 12);
    assert_eq!(message.authority_count(), 0);
    assert_eq!(message.additional_count(), 5);

    const ADB: &str = "adb-54a41f016001123._adb._tcp.local.";
    const REMOTE: &str = "KD-55XD8005._androidtvremote._tcp.local.";
    const V4_REVERSE: &str = "60.178.168.192.in-addr.arpa.";
    const V6_REVERSE: &str =
        "8.2.5.D.6.8.E.F.F.F.8.A.F.4.2.1.0.0.0.0.0.0.0.0.0.0.0.0.0.8.E.F.\
         ip6.arpa.";

    let expected = [
        Expected {
            name: ADB,
            rtype: 16,
            flush: true,
            ttl: 4500,
            detail: Detail::Text(1),
        },
        Expected {
            name: "_services._dns-sd._udp.local.",
            rtype: 12,
            flush: false,
            ttl: 4500,
            detail: Detail::Pointer("_adb._tcp.local."),
        },
        Expected {
            name: "_adb._tcp.local.",
            rtype: 12,
            flush: false,
            ttl: 4500,
            detail: Detail::Pointer(ADB),
        },
        Expected {
            name: ADB,
            rtype: 33,
            flush: true,
            ttl: 120,
            detail: Detail::Service(0, 0, 5555, "Android.local."),
        },
        Expected {
            name: REMOTE,
            rtype: 16,
            flush: true,
            ttl: 4500,
            detail: Detail::Text(21),
        },
        Expected {
            name: "_services._dns-sd._udp.local.",
            rtype: 12,
            flush: false,
            ttl: 4500,
            detail: Detail::Pointer("_androidtvremote._tcp.local."),
        },
        Expected {
            name: "_androidtvremote._tcp.local.",
            rtype: 12,
            flush: false,
            ttl: 4500,
            detail: Detail::Pointer(REMOTE),
        },
        Expected {
            name: REMOTE,
            rtype: 33,
            flush: true,
            ttl: 120,
            detail: Detail::Service(0, 0, 6466, "Android.local."),
        },
        Expected {
            name: V4_REVERSE,
            rtype: 12,
            flush: true,
            ttl: 120,
            detail: Detail::Pointer("Android.local."),
        },
        Expected {
            name: V6_REVERSE,
            rtype: 12,
            flush: true,
            ttl: 120,
            detail: Detail::Pointer("Android.local."),
        },
        Expected {
            name: "Android.local.",
            rtype: 1,
            flush: true,
            ttl: 120,
            detail: Detail::Address("192.168.178.60"),
        },
        Expected {
            name: "Android.local.",
            rtype: 28,
            flush: true,
            ttl: 120,
            detail: Detail::Address("fe80::124f:a8ff:fe86:d528"),
        },
        Expected {
            name: ADB,
            rtype: 47,
            flush: true,
            ttl: 4500,
            detail: Detail::Skipped,
        },
        Expected {
            name: REMOTE,
            rtype: 47,
            flush: true,
            ttl: 4500,
            detail: Detail::Skipped,
        },
        Expected {
            name: V4_REVERSE,
            rtype: 47,
            flush: true,
            ttl: 120,
            detail: Detail::Skipped,
        },
        Expected {
            name: V6_REVERSE,
            rtype: 47,
            flush: true,
            ttl: 120,
            detail: Detail::Skipped,
        },
        Expected {
            name: "Android.local.",
            rtype: 47,
            flush: true,
            ttl: 120,
            detail: Detail::Skipped,
        },
    ];

    let records: Vec<_> = message.responses().collect();
    assert_eq!(records.len(), expected.len());
    for (i, (resource, expected)) in
        records.iter().zip(expected.iter()).enumerate()
    {
        check_resource(i, resource, expected);
    }
}
