//! Configuration descriptor walker.
//!
//! A configuration descriptor is a flat concatenation of sub-descriptors,
//! each starting with `bLength` and `bDescriptorType`:
//!
//! ```text
//! [config 9B][interface 9B][HID 9B][endpoint 7B][endpoint 7B][interface 9B]...
//! ```
//!
//! The walker steps through them by `bLength`, picks out HID boot
//! interfaces, and resolves the IN/OUT endpoints listed after each one.
//! Every field read is bounds-checked against the buffer; a zero-length,
//! truncated, or under-sized descriptor aborts the walk with
//! [`Error::MalformedDescriptor`].

use super::host::EndpointResolver;
use super::{class_code, descriptor_type, hid_subclass, ENDPOINT_DIR_IN};
use crate::hid::DeviceKind;
use crate::Error;

/// Size of the `bLength` + `bDescriptorType` header.
const HEADER_LEN: usize = 2;

/// Configuration descriptor header (9 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigurationDescriptor {
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub attributes: u8,
    pub max_power: u8,
}

impl ConfigurationDescriptor {
    pub const LEN: usize = 9;

    /// Parse the header at the start of a configuration descriptor blob.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let d = sized(data, Self::LEN)?;
        if d[1] != descriptor_type::CONFIGURATION {
            return Err(Error::MalformedDescriptor);
        }
        Ok(Self {
            total_length: u16::from_le_bytes([d[2], d[3]]),
            num_interfaces: d[4],
            configuration_value: d[5],
            attributes: d[7],
            max_power: d[8],
        })
    }
}

/// Interface descriptor (9 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
}

impl InterfaceDescriptor {
    pub const LEN: usize = 9;

    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let d = sized(data, Self::LEN)?;
        Ok(Self {
            interface_number: d[2],
            alternate_setting: d[3],
            num_endpoints: d[4],
            class: d[5],
            subclass: d[6],
            protocol: d[7],
        })
    }

    /// HID class with the boot interface subclass.
    pub fn is_boot_hid(&self) -> bool {
        self.class == class_code::HID && self.subclass == hid_subclass::BOOT
    }
}

/// Endpoint descriptor (7 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointDescriptor {
    pub address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub const LEN: usize = 7;

    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let d = sized(data, Self::LEN)?;
        Ok(Self {
            address: d[2],
            attributes: d[3],
            max_packet_size: u16::from_le_bytes([d[4], d[5]]),
            interval: d[6],
        })
    }

    /// Device-to-host endpoint (bit 7 of the address set).
    pub fn is_in(&self) -> bool {
        self.address & ENDPOINT_DIR_IN != 0
    }
}

/// Check a descriptor slice is long enough for its fixed fields.
fn sized(data: &[u8], len: usize) -> Result<&[u8], Error> {
    if data.len() < len || (data[0] as usize) < len {
        return Err(Error::MalformedDescriptor);
    }
    Ok(data)
}

/// A boot HID interface located by the walker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceBinding<E> {
    pub interface_number: u8,
    pub device_kind: DeviceKind,
    pub in_endpoint: Option<E>,
    pub out_endpoint: Option<E>,
}

impl<E> InterfaceBinding<E> {
    fn new(interface_number: u8, device_kind: DeviceKind) -> Self {
        Self {
            interface_number,
            device_kind,
            in_endpoint: None,
            out_endpoint: None,
        }
    }
}

/// Outcome of one [`find_next_hid_interface`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkStep<E> {
    /// A boot HID interface was accepted.  `resume` is the offset of the
    /// interface descriptor that follows it, or `None` at the end of the blob.
    Found {
        binding: InterfaceBinding<E>,
        resume: Option<usize>,
    },
    /// The interface at the cursor is not a boot HID interface.
    /// Scanning continues at `resume`, the descriptor right after it.
    Rejected { interface_number: u8, resume: usize },
    /// The end of the blob was reached without accepting an interface.
    End,
}

/// Scan `config` from offset `start` for the next boot HID interface.
///
/// `start` is either the configuration header (offset 0) or a `resume`
/// offset from a previous call.  Endpoint descriptors after an accepted
/// interface are resolved through `resolver`; those seen before one are
/// skipped.  Performs no I/O besides endpoint resolution.
pub fn find_next_hid_interface<R: EndpointResolver>(
    config: &[u8],
    start: usize,
    resolver: &mut R,
    device: R::Device,
) -> Result<WalkStep<R::Endpoint>, Error> {
    let end = config.len();
    let mut cursor = start;
    let mut accepted: Option<InterfaceBinding<R::Endpoint>> = None;

    while cursor < end {
        let header = config
            .get(cursor..cursor + HEADER_LEN)
            .ok_or(Error::MalformedDescriptor)?;
        let length = header[0] as usize;
        if length < HEADER_LEN {
            return Err(Error::MalformedDescriptor);
        }
        let next = cursor + length;
        let desc = config.get(cursor..next).ok_or(Error::MalformedDescriptor)?;

        match header[1] {
            descriptor_type::INTERFACE => {
                if let Some(binding) = accepted {
                    return Ok(WalkStep::Found {
                        binding,
                        resume: Some(cursor),
                    });
                }
                let iface = InterfaceDescriptor::parse(desc)?;
                if !iface.is_boot_hid() {
                    return Ok(WalkStep::Rejected {
                        interface_number: iface.interface_number,
                        resume: next,
                    });
                }
                accepted = Some(InterfaceBinding::new(
                    iface.interface_number,
                    DeviceKind::from_protocol(iface.protocol),
                ));
            }
            descriptor_type::ENDPOINT => {
                if let Some(binding) = accepted.as_mut() {
                    let ep = EndpointDescriptor::parse(desc)?;
                    let handle = resolver.endpoint(device, ep.address);
                    if ep.is_in() {
                        binding.in_endpoint = handle;
                    } else {
                        binding.out_endpoint = handle;
                    }
                }
            }
            _ => {}
        }

        cursor = next;
    }

    Ok(match accepted {
        Some(binding) => WalkStep::Found {
            binding,
            resume: None,
        },
        None => WalkStep::End,
    })
}

/// Iterator over every boot HID interface in a configuration descriptor.
///
/// Rejected interfaces are skipped.  A malformed descriptor is yielded
/// once as an error and ends the iteration.
pub struct HidInterfaces<'a, 'r, R: EndpointResolver> {
    config: &'a [u8],
    cursor: Option<usize>,
    resolver: &'r mut R,
    device: R::Device,
}

impl<R: EndpointResolver> Iterator for HidInterfaces<'_, '_, R> {
    type Item = Result<InterfaceBinding<R::Endpoint>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.cursor?;
            match find_next_hid_interface(self.config, cursor, &mut *self.resolver, self.device) {
                Ok(WalkStep::Found { binding, resume }) => {
                    self.cursor = resume;
                    return Some(Ok(binding));
                }
                Ok(WalkStep::Rejected { resume, .. }) => self.cursor = Some(resume),
                Ok(WalkStep::End) => {
                    self.cursor = None;
                    return None;
                }
                Err(e) => {
                    self.cursor = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Walk all boot HID interfaces in `config`.
pub fn hid_interfaces<'a, 'r, R: EndpointResolver>(
    config: &'a [u8],
    resolver: &'r mut R,
    device: R::Device,
) -> HidInterfaces<'a, 'r, R> {
    HidInterfaces {
        config,
        cursor: Some(0),
        resolver,
        device,
    }
}
