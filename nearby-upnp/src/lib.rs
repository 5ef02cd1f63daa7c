//! UPnP device and service descriptions
//!
//! SSDP (see nearby-ssdp) tells us *that* a device exists and where
//! its description document lives; this crate fetches and decodes
//! those documents into typed records. A device description yields
//! the device's identity, manufacturer and model details, icons, and
//! service list; each service optionally links an SCPD document
//! enumerating its actions and state variables.
//!
//! Both document kinds are decoded by the declarative XML state
//! machine in [`xml`]: a grammar maps `(state, element)` pairs to
//! transitions and typed assignments, rejects anything its own
//! namespace doesn't declare (with line and column), and skips
//! foreign namespaces entirely. The [`device`] and [`scpd`] modules
//! define the two grammars.
//!
//! The [`Resolver`] drives the fetch graph: description documents
//! first, then (depending on [`Behaviors`]) icons and SCPDs
//! concurrently, assembling one aggregate [`DeviceDescription`] per
//! described device even when individual sub-requests fail.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Device description documents and their grammar
pub mod device;

/// The descriptor fetch pipeline
pub mod resolver;

/// SCPD (service description) documents and their grammar
pub mod scpd;

/// The declarative XML state machine
pub mod xml;

pub use device::{
    DeviceDescription, DeviceManufacturer, DeviceModel, IconDescription,
    ServiceDescription, SpecVersion,
};
pub use resolver::{Behaviors, Callback, HttpClient, HttpError, Resolver};
pub use scpd::{
    ActionDescription, ArgumentDescription, ControlPointDescription,
    DataType, Direction, StateVariableDescription, ValueRange,
};
