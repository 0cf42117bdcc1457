//! Scriptable in-memory bus that records every call in order.

use std::cell::RefCell;
use std::rc::Rc;

use cm6206_core::{ControlSetup, TargetIdentity};

use crate::backend::{BusDevice, DeviceKey, DeviceObject, InterfaceObject, UsbBus};
use crate::error::{UsbError, UsbResult};

/// One recorded backend call. The first field is the mock device id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Enumerate,
    CreateObject(u8),
    Open(u8),
    ConfigurationCount(u8),
    ConfigurationValue(u8, u8),
    SetConfiguration(u8, u8),
    InterfaceNumbers(u8),
    CreateInterface(u8, u8),
    InterfaceOpen(u8, u8),
    InterfaceSeize(u8, u8),
    ControlOut(u8, ControlSetup, Vec<u8>),
    ClearStall(u8),
    InterfaceClose(u8, u8),
    InterfaceRelease(u8, u8),
    Close(u8),
    Release(u8),
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

/// Failures a mock device should report.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub create_object: Option<UsbError>,
    pub open_failures: u32,
    pub configurations: u8,
    pub configuration_count_error: Option<UsbError>,
    pub config_descriptor_error: Option<UsbError>,
    pub set_configuration_error: Option<UsbError>,
    pub interfaces: Vec<u8>,
    pub interfaces_error: Option<UsbError>,
    pub create_interface_error: Option<UsbError>,
    pub interface_open_error: Option<UsbError>,
    pub seize_error: Option<UsbError>,
    /// Result of the n-th control transfer; missing entries succeed.
    pub control_errors: Vec<Option<UsbError>>,
    pub interface_close_error: Option<UsbError>,
    pub interface_release_error: Option<UsbError>,
    pub close_error: Option<UsbError>,
    pub release_error: Option<UsbError>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            create_object: None,
            open_failures: 0,
            configurations: 1,
            configuration_count_error: None,
            config_descriptor_error: None,
            set_configuration_error: None,
            interfaces: vec![0, 1, 2, 3],
            interfaces_error: None,
            create_interface_error: None,
            interface_open_error: None,
            seize_error: None,
            control_errors: Vec::new(),
            interface_close_error: None,
            interface_release_error: None,
            close_error: None,
            release_error: None,
        }
    }
}

fn outcome(error: Option<&UsbError>) -> UsbResult<()> {
    error.map_or(Ok(()), |e| Err(e.clone()))
}

pub(crate) fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

#[derive(Debug, Clone)]
pub(crate) struct MockDevice {
    pub id: u8,
    pub script: Script,
    pub log: CallLog,
}

impl MockDevice {
    pub fn new(id: u8, log: &CallLog) -> Self {
        Self { id, script: Script::default(), log: Rc::clone(log) }
    }

    pub fn with_script(id: u8, script: Script, log: &CallLog) -> Self {
        Self { id, script, log: Rc::clone(log) }
    }
}

impl BusDevice for MockDevice {
    type Object = MockObject;

    fn key(&self) -> DeviceKey {
        DeviceKey { bus: 1, address: self.id }
    }

    fn display_name(&self) -> String {
        format!("Mock CM6206 #{}", self.id)
    }

    fn create_object(&self) -> UsbResult<MockObject> {
        self.log.borrow_mut().push(Call::CreateObject(self.id));
        outcome(self.script.create_object.as_ref())?;
        Ok(MockObject {
            id: self.id,
            script: self.script.clone(),
            log: Rc::clone(&self.log),
            open_attempts: 0,
            writes: 0,
        })
    }
}

pub(crate) struct MockObject {
    id: u8,
    script: Script,
    log: CallLog,
    open_attempts: u32,
    writes: usize,
}

impl DeviceObject for MockObject {
    type Interface<'a>
        = MockInterface<'a>
    where
        Self: 'a;

    fn open(&mut self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::Open(self.id));
        self.open_attempts += 1;
        if self.open_attempts <= self.script.open_failures {
            return Err(UsbError::NoDevice);
        }
        Ok(())
    }

    fn configuration_count(&self) -> UsbResult<u8> {
        self.log.borrow_mut().push(Call::ConfigurationCount(self.id));
        outcome(self.script.configuration_count_error.as_ref())?;
        Ok(self.script.configurations)
    }

    fn configuration_value(&self, index: u8) -> UsbResult<u8> {
        self.log.borrow_mut().push(Call::ConfigurationValue(self.id, index));
        outcome(self.script.config_descriptor_error.as_ref())?;
        Ok(index + 1)
    }

    fn set_configuration(&mut self, value: u8) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::SetConfiguration(self.id, value));
        outcome(self.script.set_configuration_error.as_ref())
    }

    fn interface_numbers(&self) -> UsbResult<Vec<u8>> {
        self.log.borrow_mut().push(Call::InterfaceNumbers(self.id));
        outcome(self.script.interfaces_error.as_ref())?;
        Ok(self.script.interfaces.clone())
    }

    fn interface(&mut self, number: u8) -> UsbResult<MockInterface<'_>> {
        self.log.borrow_mut().push(Call::CreateInterface(self.id, number));
        outcome(self.script.create_interface_error.as_ref())?;
        Ok(MockInterface { device: self.id, number, script: &self.script, log: &self.log, writes: &mut self.writes })
    }

    fn close(&mut self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::Close(self.id));
        outcome(self.script.close_error.as_ref())
    }

    fn release(self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::Release(self.id));
        outcome(self.script.release_error.as_ref())
    }
}

pub(crate) struct MockInterface<'a> {
    device: u8,
    number: u8,
    script: &'a Script,
    log: &'a CallLog,
    writes: &'a mut usize,
}

impl InterfaceObject for MockInterface<'_> {
    fn number(&self) -> u8 {
        self.number
    }

    fn open(&mut self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::InterfaceOpen(self.device, self.number));
        outcome(self.script.interface_open_error.as_ref())
    }

    fn open_seize(&mut self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::InterfaceSeize(self.device, self.number));
        outcome(self.script.seize_error.as_ref())
    }

    fn control_out(&mut self, setup: &ControlSetup, data: &[u8]) -> UsbResult<usize> {
        self.log.borrow_mut().push(Call::ControlOut(self.device, *setup, data.to_vec()));
        let error = self.script.control_errors.get(*self.writes).cloned().flatten();
        *self.writes += 1;
        match error {
            Some(e) => Err(e),
            None => Ok(data.len()),
        }
    }

    fn clear_pipe_stall(&mut self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::ClearStall(self.device));
        Ok(())
    }

    fn close(&mut self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::InterfaceClose(self.device, self.number));
        outcome(self.script.interface_close_error.as_ref())
    }

    fn release(self) -> UsbResult<()> {
        self.log.borrow_mut().push(Call::InterfaceRelease(self.device, self.number));
        outcome(self.script.interface_release_error.as_ref())
    }
}

/// Bus whose attached devices can be changed between passes.
pub(crate) struct MockBus {
    pub devices: RefCell<Vec<MockDevice>>,
    pub enumerate_error: Option<UsbError>,
    pub log: CallLog,
}

impl MockBus {
    pub fn new(devices: Vec<MockDevice>, log: &CallLog) -> Self {
        Self { devices: RefCell::new(devices), enumerate_error: None, log: Rc::clone(log) }
    }
}

impl UsbBus for MockBus {
    type Device = MockDevice;

    fn matching_devices(&self, _target: TargetIdentity) -> UsbResult<Vec<MockDevice>> {
        self.log.borrow_mut().push(Call::Enumerate);
        outcome(self.enumerate_error.as_ref())?;
        Ok(self.devices.borrow().clone())
    }
}

/// Count calls equal to `call`.
pub(crate) fn count(log: &CallLog, call: &Call) -> usize {
    log.borrow().iter().filter(|c| *c == call).count()
}

/// Register/value pairs written to `device`, in order.
pub(crate) fn writes(log: &CallLog, device: u8) -> Vec<(u8, u16)> {
    log.borrow()
        .iter()
        .filter_map(|c| match c {
            Call::ControlOut(id, _, data) if *id == device => {
                Some((data[3], u16::from_le_bytes([data[1], data[2]])))
            }
            _ => None,
        })
        .collect()
}
