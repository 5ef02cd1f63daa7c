use crate::scpd::ControlPointDescription;
use crate::xml::{self, Grammar};
use url::Url;

/// The namespace of UPnP device description documents
pub const DEVICE_NAMESPACE: &str = "urn:schemas-upnp-org:device-1-0";

/// A dotted specification version, e.g. 1.1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecVersion {
    /// The major segment
    pub major: u32,
    /// The minor segment
    pub minor: u32,
}

/// One icon advertised by a device
///
/// The URL is typically relative to the device's base URL; `data`
/// stays empty unless the pipeline was asked to load icons.
#[derive(Debug, Clone, Default)]
pub struct IconDescription {
    /// The icon's MIME type, e.g. "image/png"
    pub mime_type: String,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Color depth in bits
    pub depth: u32,

    /// Where to fetch the icon, possibly relative
    pub url: String,

    /// The fetched icon bytes, if loaded
    pub data: Vec<u8>,
}

/// One service advertised by a device
#[derive(Debug, Clone, Default)]
pub struct ServiceDescription {
    /// The service identifier, e.g. "urn:upnp-org:serviceId:AVTransport"
    pub id: String,

    /// The service type, e.g. "urn:schemas-upnp-org:service:AVTransport:1"
    pub service_type: String,

    /// Where the service's SCPD document lives, possibly relative
    pub scpd_url: String,

    /// The service's control endpoint, possibly relative
    pub control_url: String,

    /// The service's eventing endpoint, possibly relative
    pub eventing_url: String,

    /// The fetched and decoded SCPD, if loaded
    pub scpd: Option<ControlPointDescription>,
}

/// Who made the device
#[derive(Debug, Clone, Default)]
pub struct DeviceManufacturer {
    /// Manufacturer name
    pub name: String,

    /// Manufacturer web site, possibly empty
    pub url: String,
}

/// What the device is
#[derive(Debug, Clone, Default)]
pub struct DeviceModel {
    /// Long description
    pub description: String,

    /// Model name
    pub name: String,

    /// Model number
    pub number: String,

    /// Model web site, possibly empty
    pub url: String,

    /// Universal Product Code, if stated
    pub universal_product_code: String,
}

/// Everything a device description document says about one device
///
/// A document describes a root device which may embed further
/// devices; [`DeviceDescription::parse`] flattens those into one
/// list, root first.
#[derive(Debug, Clone, Default)]
pub struct DeviceDescription {
    /// Where the document was fetched from
    pub url: Option<Url>,

    /// Base for resolving the relative URLs herein
    pub base_url: Option<Url>,

    /// The document's UPnP spec version
    pub spec_version: SpecVersion,

    /// Unique Device Name, a uuid: URN
    pub unique_device_name: String,

    /// The device type URN
    pub device_type: String,

    /// Human-readable name (friendlyName)
    pub display_name: String,

    /// Who made it
    pub manufacturer: DeviceManufacturer,

    /// What it is
    pub model: DeviceModel,

    /// The device's presentation page, possibly relative
    pub presentation_url: String,

    /// Serial number, if stated
    pub serial_number: String,

    /// Advertised icons
    pub icons: Vec<IconDescription>,

    /// Advertised services
    pub services: Vec<ServiceDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DeviceState {
    Document,
    Root,
    SpecVersion,
    DeviceList,
    Device,
    IconList,
    Icon,
    ServiceList,
    Service,
}

#[derive(Default)]
struct DeviceContext {
    devices: Vec<DeviceDescription>,
    stack: Vec<usize>,
    url: Option<Url>,
    base_url: Option<Url>,
    spec_version: SpecVersion,
}

impl DeviceContext {
    fn device(&mut self) -> Option<&mut DeviceDescription> {
        self.stack.last().map(|i| &mut self.devices[*i])
    }

    fn icon(&mut self) -> Option<&mut IconDescription> {
        self.device().and_then(|d| d.icons.last_mut())
    }

    fn service(&mut self) -> Option<&mut ServiceDescription> {
        self.device().and_then(|d| d.services.last_mut())
    }

    fn enter_device(&mut self) {
        let base = self.base_url.clone().or_else(|| self.url.clone());
        let device = DeviceDescription {
            // nested devices share the document's base as their URL
            url: if self.stack.is_empty() {
                self.url.clone()
            } else {
                base.clone()
            },
            base_url: base,
            ..DeviceDescription::default()
        };
        self.devices.push(device);
        self.stack.push(self.devices.len() - 1);
    }

    fn leave_device(&mut self) {
        self.stack.pop();
    }
}

fn grammar() -> Grammar<DeviceState, DeviceContext> {
    use DeviceState as S;

    Grammar::new(DEVICE_NAMESPACE)
        .transition(S::Document, "root", S::Root)
        .assign(S::Root, "URLBase", |c: &mut DeviceContext, v: Url| {
            if let Some(first) = c.devices.first_mut() {
                first.base_url = Some(v.clone());
            }
            c.base_url = Some(v);
        })
        .transition(S::Root, "specVersion", S::SpecVersion)
        .transition_with(S::Root, "device", S::Device, DeviceContext::enter_device)
        .assign(S::SpecVersion, "major", |c: &mut DeviceContext, v| {
            c.spec_version.major = v;
        })
        .assign(S::SpecVersion, "minor", |c: &mut DeviceContext, v| {
            c.spec_version.minor = v;
        })
        .assign(S::Device, "deviceType", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.device_type = v;
            }
        })
        .assign(S::Device, "friendlyName", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.display_name = v;
            }
        })
        .assign(S::Device, "manufacturer", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.manufacturer.name = v;
            }
        })
        .assign(S::Device, "manufacturerURL", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.manufacturer.url = v;
            }
        })
        .assign(S::Device, "modelDescription", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.model.description = v;
            }
        })
        .assign(S::Device, "modelName", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.model.name = v;
            }
        })
        .assign(S::Device, "modelNumber", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.model.number = v;
            }
        })
        .assign(S::Device, "modelURL", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.model.url = v;
            }
        })
        .assign(S::Device, "presentationURL", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.presentation_url = v;
            }
        })
        .assign(S::Device, "serialNumber", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.serial_number = v;
            }
        })
        .assign(S::Device, "UDN", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.unique_device_name = v;
            }
        })
        .assign(S::Device, "UPC", |c: &mut DeviceContext, v| {
            if let Some(d) = c.device() {
                d.model.universal_product_code = v;
            }
        })
        .transition(S::Device, "deviceList", S::DeviceList)
        .transition(S::Device, "iconList", S::IconList)
        .transition(S::Device, "serviceList", S::ServiceList)
        .on_exit(S::Device, DeviceContext::leave_device)
        .transition_with(S::DeviceList, "device", S::Device, DeviceContext::enter_device)
        .transition_with(S::IconList, "icon", S::Icon, |c: &mut DeviceContext| {
            if let Some(d) = c.device() {
                d.icons.push(IconDescription::default());
            }
        })
        .assign(S::Icon, "mimetype", |c: &mut DeviceContext, v| {
            if let Some(icon) = c.icon() {
                icon.mime_type = v;
            }
        })
        .assign(S::Icon, "width", |c: &mut DeviceContext, v| {
            if let Some(icon) = c.icon() {
                icon.width = v;
            }
        })
        .assign(S::Icon, "height", |c: &mut DeviceContext, v| {
            if let Some(icon) = c.icon() {
                icon.height = v;
            }
        })
        .assign(S::Icon, "depth", |c: &mut DeviceContext, v| {
            if let Some(icon) = c.icon() {
                icon.depth = v;
            }
        })
        .assign(S::Icon, "url", |c: &mut DeviceContext, v| {
            if let Some(icon) = c.icon() {
                icon.url = v;
            }
        })
        .transition_with(
            S::ServiceList,
            "service",
            S::Service,
            |c: &mut DeviceContext| {
                if let Some(d) = c.device() {
                    d.services.push(ServiceDescription::default());
                }
            },
        )
        .assign(S::Service, "serviceId", |c: &mut DeviceContext, v| {
            if let Some(s) = c.service() {
                s.id = v;
            }
        })
        .assign(S::Service, "serviceType", |c: &mut DeviceContext, v| {
            if let Some(s) = c.service() {
                s.service_type = v;
            }
        })
        .assign(S::Service, "SCPDURL", |c: &mut DeviceContext, v| {
            if let Some(s) = c.service() {
                s.scpd_url = v;
            }
        })
        .assign(S::Service, "controlURL", |c: &mut DeviceContext, v| {
            if let Some(s) = c.service() {
                s.control_url = v;
            }
        })
        .assign(S::Service, "eventSubURL", |c: &mut DeviceContext, v| {
            if let Some(s) = c.service() {
                s.eventing_url = v;
            }
        })
}

impl DeviceDescription {
    /// Decode a device description document
    ///
    /// Returns the described devices, root device first, nested
    /// devices flattened behind it in document order.
    ///
    /// # Errors
    ///
    /// Returns the grammar or syntax [`xml::Error`] that stopped
    /// the document.
    pub fn parse(
        input: &[u8],
        device_url: Option<&Url>,
    ) -> Result<Vec<DeviceDescription>, xml::Error> {
        let mut context = DeviceContext {
            url: device_url.cloned(),
            base_url: device_url.cloned(),
            ..DeviceContext::default()
        };
        xml::parse_document(
            input,
            DeviceState::Document,
            &grammar(),
            &mut context,
        )?;

        // the spec version belongs to the document, i.e. the root device
        if let Some(root) = context.devices.first_mut() {
            root.spec_version = context.spec_version;
        }
        Ok(context.devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://192.168.1.9:49152/description.xml").unwrap()
    }

    #[test]
    fn parses_simple_document() {
        let devices = DeviceDescription::parse(
            br#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>2</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
    <friendlyName>Living Room Speaker</friendlyName>
    <manufacturer>Fnord Audio</manufacturer>
    <manufacturerURL>http://fnord.example</manufacturerURL>
    <modelDescription>Networked loudspeaker</modelDescription>
    <modelName>FA-100</modelName>
    <modelNumber>100</modelNumber>
    <UDN>uuid:2fac1234-31f8-11b4-a222-08002b34c003</UDN>
    <serialNumber>0042</serialNumber>
    <presentationURL>/index.html</presentationURL>
    <iconList>
      <icon>
        <mimetype>image/png</mimetype>
        <width>48</width>
        <height>48</height>
        <depth>24</depth>
        <url>/icons/48.png</url>
      </icon>
    </iconList>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:RenderingControl:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:RenderingControl</serviceId>
        <SCPDURL>/scpd/rc.xml</SCPDURL>
        <controlURL>/control/rc</controlURL>
        <eventSubURL>/event/rc</eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#,
            Some(&base()),
        )
        .unwrap();

        assert_eq!(devices.len(), 1);
        let device = &devices[0];
        assert_eq!(
            device.spec_version,
            SpecVersion { major: 1, minor: 2 }
        );
        assert_eq!(device.url.as_ref(), Some(&base()));
        assert_eq!(device.base_url.as_ref(), Some(&base()));
        assert_eq!(
            device.device_type,
            "urn:schemas-upnp-org:device:MediaRenderer:1"
        );
        assert_eq!(device.display_name, "Living Room Speaker");
        assert_eq!(device.manufacturer.name, "Fnord Audio");
        assert_eq!(device.manufacturer.url, "http://fnord.example");
        assert_eq!(device.model.description, "Networked loudspeaker");
        assert_eq!(device.model.name, "FA-100");
        assert_eq!(device.model.number, "100");
        assert_eq!(
            device.unique_device_name,
            "uuid:2fac1234-31f8-11b4-a222-08002b34c003"
        );
        assert_eq!(device.serial_number, "0042");
        assert_eq!(device.presentation_url, "/index.html");

        assert_eq!(device.icons.len(), 1);
        let icon = &device.icons[0];
        assert_eq!(icon.mime_type, "image/png");
        assert_eq!((icon.width, icon.height, icon.depth), (48, 48, 24));
        assert_eq!(icon.url, "/icons/48.png");
        assert!(icon.data.is_empty());

        assert_eq!(device.services.len(), 1);
        let service = &device.services[0];
        assert_eq!(
            service.service_type,
            "urn:schemas-upnp-org:service:RenderingControl:1"
        );
        assert_eq!(service.id, "urn:upnp-org:serviceId:RenderingControl");
        assert_eq!(service.scpd_url, "/scpd/rc.xml");
        assert_eq!(service.control_url, "/control/rc");
        assert_eq!(service.eventing_url, "/event/rc");
        assert!(service.scpd.is_none());
    }

    #[test]
    fn url_base_propagates() {
        let devices = DeviceDescription::parse(
            br#"<root xmlns="urn:schemas-upnp-org:device-1-0">
  <URLBase>http://192.168.1.9:1400/</URLBase>
  <device><deviceType>urn:x:device:Thing:1</deviceType></device>
</root>"#,
            Some(&base()),
        )
        .unwrap();

        assert_eq!(devices[0].url.as_ref(), Some(&base()));
        assert_eq!(
            devices[0].base_url.as_ref().map(Url::as_str),
            Some("http://192.168.1.9:1400/")
        );
    }

    #[test]
    fn nested_devices_flatten_root_first() {
        let devices = DeviceDescription::parse(
            br#"<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <deviceType>urn:x:device:Outer:1</deviceType>
    <deviceList>
      <device>
        <deviceType>urn:x:device:InnerOne:1</deviceType>
        <UDN>uuid:inner-one</UDN>
      </device>
      <device>
        <deviceType>urn:x:device:InnerTwo:1</deviceType>
      </device>
    </deviceList>
    <UDN>uuid:outer</UDN>
  </device>
</root>"#,
            Some(&base()),
        )
        .unwrap();

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].device_type, "urn:x:device:Outer:1");
        // the outer UDN follows the deviceList yet lands on the outer record
        assert_eq!(devices[0].unique_device_name, "uuid:outer");
        assert_eq!(devices[1].device_type, "urn:x:device:InnerOne:1");
        assert_eq!(devices[1].unique_device_name, "uuid:inner-one");
        assert_eq!(devices[2].device_type, "urn:x:device:InnerTwo:1");
        // only the root device carries the document's spec version
        assert_eq!(devices[1].spec_version, SpecVersion::default());
    }

    #[test]
    fn foreign_namespaces_inside_root_skipped() {
        let devices = DeviceDescription::parse(
            br#"<root xmlns="urn:schemas-upnp-org:device-1-0"
      xmlns:v="urn:vendor:whatever">
  <v:stuff><v:nested>ignored</v:nested></v:stuff>
  <device><deviceType>urn:x:device:Thing:1</deviceType></device>
</root>"#,
            None,
        )
        .unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_type, "urn:x:device:Thing:1");
        assert_eq!(devices[0].url, None);
    }

    #[test]
    fn unknown_element_fails_document() {
        let result = DeviceDescription::parse(
            br#"<root xmlns="urn:schemas-upnp-org:device-1-0">
  <fnord/>
</root>"#,
            None,
        );
        assert!(matches!(
            result,
            Err(xml::Error::UnexpectedElement { .. })
        ));
    }

    #[test]
    fn bad_icon_size_fails_document() {
        let result = DeviceDescription::parse(
            br#"<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device><iconList><icon><width>wide</width></icon></iconList></device>
</root>"#,
            None,
        );
        assert!(matches!(result, Err(xml::Error::Conversion { .. })));
    }

    #[test]
    fn document_without_devices_is_empty() {
        let devices = DeviceDescription::parse(
            br#"<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
</root>"#,
            None,
        )
        .unwrap();
        assert!(devices.is_empty());
    }
}
