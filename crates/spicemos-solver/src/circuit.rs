//! A flat list of devices sharing one [`SimContext`].

use spicemos_core::{Integrator, NodeId, NodeVector, SimContext, SimOptions};
use spicemos_devices::{BackupMode, Device, InstanceQuery, Mosfet};

use crate::elements::{Resistor, VoltageSource};
use crate::error::{Error, Result};
use crate::linear::solve_system;

/// Any device the drivers know how to assemble.
#[derive(Debug, Clone)]
pub enum Element {
    Mosfet(Mosfet),
    Resistor(Resistor),
    VoltageSource(VoltageSource),
}

impl Element {
    pub fn device(&self) -> &dyn Device {
        match self {
            Element::Mosfet(d) => d,
            Element::Resistor(d) => d,
            Element::VoltageSource(d) => d,
        }
    }

    pub fn device_mut(&mut self) -> &mut dyn Device {
        match self {
            Element::Mosfet(d) => d,
            Element::Resistor(d) => d,
            Element::VoltageSource(d) => d,
        }
    }
}

impl From<Mosfet> for Element {
    fn from(d: Mosfet) -> Self {
        Element::Mosfet(d)
    }
}

impl From<Resistor> for Element {
    fn from(d: Resistor) -> Self {
        Element::Resistor(d)
    }
}

impl From<VoltageSource> for Element {
    fn from(d: VoltageSource) -> Self {
        Element::VoltageSource(d)
    }
}

/// Devices plus the context they are loaded into.
#[derive(Debug)]
pub struct Circuit {
    pub ctx: SimContext,
    pub(crate) elements: Vec<Element>,
    ready: bool,
}

impl Circuit {
    pub fn new(options: SimOptions) -> Self {
        Self {
            ctx: SimContext::new(options),
            elements: Vec::new(),
            ready: false,
        }
    }

    /// Replace the integration method used by transient analysis.
    pub fn with_integrator(mut self, integrator: Box<dyn Integrator>) -> Self {
        self.ctx.integrator = integrator;
        self
    }

    /// Look up or create an external node.
    pub fn node(&mut self, name: &str) -> NodeId {
        self.ctx.nodes.node(name)
    }

    pub fn add(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
        self.ready = false;
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    fn find(&self, name: &str) -> Result<&Element> {
        self.elements
            .iter()
            .find(|e| e.device().name() == name)
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))
    }

    pub fn mosfet(&self, name: &str) -> Result<&Mosfet> {
        match self.find(name)? {
            Element::Mosfet(m) => Ok(m),
            _ => Err(Error::UnknownDevice(name.to_string())),
        }
    }

    pub fn mosfet_mut(&mut self, name: &str) -> Result<&mut Mosfet> {
        self.elements
            .iter_mut()
            .find_map(|e| match e {
                Element::Mosfet(m) if m.name() == name => Some(m),
                _ => None,
            })
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))
    }

    pub fn voltage_source_mut(&mut self, name: &str) -> Result<&mut VoltageSource> {
        self.elements
            .iter_mut()
            .find_map(|e| match e {
                Element::VoltageSource(v) if v.name() == name => Some(v),
                _ => None,
            })
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))
    }

    /// Operating-point value of a MOSFET from its last load.
    pub fn query(&self, name: &str, query: InstanceQuery) -> Result<f64> {
        Ok(self.mosfet(name)?.query(&self.ctx, query)?)
    }

    /// Present solution value of a node.
    pub fn voltage(&self, node: NodeId) -> f64 {
        self.ctx.rhs_old.get(node)
    }

    /// Branch unknown of a voltage source, available after setup.
    pub fn branch(&self, name: &str) -> Result<NodeId> {
        match self.find(name)? {
            Element::VoltageSource(v) => v
                .branch()
                .ok_or_else(|| Error::InvalidAnalysis(format!("{name} is not set up"))),
            _ => Err(Error::UnknownDevice(name.to_string())),
        }
    }

    /// Branch current of a voltage source.
    pub fn source_current(&self, name: &str) -> Result<f64> {
        Ok(self.ctx.rhs_old.get(self.branch(name)?))
    }

    /// Set up every device and run temperature correction.
    pub fn setup(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }
        for e in &mut self.elements {
            e.device_mut().setup(&mut self.ctx)?;
        }
        self.ctx.resize_vectors();
        self.temperature()?;
        self.ready = true;
        log::debug!(
            "circuit setup: {} devices, {} unknowns, {} states",
            self.elements.len(),
            self.ctx.size(),
            self.ctx.states.len()
        );
        Ok(())
    }

    /// Hand back internal nodes and matrix handles.
    pub fn unsetup(&mut self) -> Result<()> {
        for e in self.elements.iter_mut().rev() {
            e.device_mut().unsetup(&mut self.ctx)?;
        }
        self.ready = false;
        Ok(())
    }

    /// Rerun temperature correction, e.g. after changing `options.temp`.
    pub fn temperature(&mut self) -> Result<()> {
        for e in &mut self.elements {
            e.device_mut().temperature(&self.ctx)?;
        }
        Ok(())
    }

    /// Clear and reassemble the real system at the present iterate.
    pub(crate) fn load(&mut self) -> Result<()> {
        self.ctx.clear_load();
        for e in &mut self.elements {
            e.device_mut().load(&mut self.ctx)?;
        }
        Ok(())
    }

    pub(crate) fn solve(&self) -> Result<NodeVector> {
        solve_system(&self.ctx.matrix, &self.ctx.rhs, self.ctx.size())
    }

    /// Ask every device whether it has converged. Stops at the first no.
    pub(crate) fn devices_converged(&mut self) -> bool {
        let ctx = &mut self.ctx;
        self.elements
            .iter_mut()
            .all(|e| e.device_mut().conv_test(ctx))
    }

    /// Smallest step the devices' truncation estimates allow.
    pub(crate) fn truncation_limit(&self) -> f64 {
        let mut limit = f64::INFINITY;
        for e in &self.elements {
            e.device().trunc(&self.ctx, &mut limit);
        }
        limit
    }

    /// Fill unspecified device initial conditions from the present solution.
    pub fn getic(&mut self) {
        for e in &mut self.elements {
            e.device_mut().getic(&self.ctx);
        }
    }

    pub fn backup(&mut self, mode: BackupMode) {
        for e in &mut self.elements {
            e.device_mut().backup(mode);
        }
    }
}
