//! Core design data structures.
//!
//! Defines the physical design the checker reads: library masters with
//! per-pin gate and diffusion areas, placed instances, their terminals, and
//! nets carrying wire descriptions. The [`Design`] is owned by the caller;
//! the checker only ever borrows it immutably.

use crate::error::DbError;
use crate::ids::{InstTermId, InstanceId, MasterId, NetId};
use crate::tech::Technology;
use crate::wire::Wire;
use serde::{Deserialize, Serialize};
use spark_common::Point;
use std::collections::HashMap;

/// A complete design snapshot: technology, library, instances and nets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    /// Design name.
    pub name: String,
    /// Process technology.
    pub tech: Technology,
    /// Library masters.
    pub masters: Vec<Master>,
    /// Placed instances.
    pub instances: Vec<Instance>,
    /// Instance terminals (one per instance pin).
    pub terms: Vec<InstTerm>,
    /// Nets.
    pub nets: Vec<Net>,
    #[serde(skip)]
    master_by_name: HashMap<String, MasterId>,
    #[serde(skip)]
    instance_by_name: HashMap<String, InstanceId>,
    #[serde(skip)]
    net_by_name: HashMap<String, NetId>,
}

impl Design {
    /// Creates an empty design over the given technology.
    pub fn new(name: impl Into<String>, tech: Technology) -> Self {
        Self {
            name: name.into(),
            tech,
            masters: Vec::new(),
            instances: Vec::new(),
            terms: Vec::new(),
            nets: Vec::new(),
            master_by_name: HashMap::new(),
            instance_by_name: HashMap::new(),
            net_by_name: HashMap::new(),
        }
    }

    /// Adds a library master and returns its ID.
    pub fn add_master(&mut self, name: &str, pins: Vec<MasterPin>) -> MasterId {
        let id = MasterId::from_raw(self.masters.len() as u32);
        self.master_by_name.insert(name.to_string(), id);
        self.masters.push(Master {
            id,
            name: name.to_string(),
            pins,
        });
        id
    }

    /// Places an instance of `master` and creates one terminal per master pin.
    pub fn add_instance(&mut self, name: &str, master: MasterId, location: Point) -> InstanceId {
        let id = InstanceId::from_raw(self.instances.len() as u32);
        let pin_count = self.master(master).pins.len();
        let mut terms = Vec::with_capacity(pin_count);
        for pin in 0..pin_count {
            let term = InstTermId::from_raw(self.terms.len() as u32);
            self.terms.push(InstTerm {
                id: term,
                instance: id,
                pin,
                net: None,
            });
            terms.push(term);
        }
        self.instance_by_name.insert(name.to_string(), id);
        self.instances.push(Instance {
            id,
            name: name.to_string(),
            master,
            location,
            terms,
        });
        id
    }

    /// Adds an empty net and returns its ID.
    pub fn add_net(&mut self, name: &str) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.net_by_name.insert(name.to_string(), id);
        self.nets.push(Net {
            id,
            name: name.to_string(),
            terms: Vec::new(),
            wires: Vec::new(),
            special: false,
        });
        id
    }

    /// Connects a terminal to a net, disconnecting it from any previous net.
    pub fn connect(&mut self, term: InstTermId, net: NetId) {
        if let Some(old) = self.terms[term.as_raw() as usize].net {
            self.nets[old.as_raw() as usize].terms.retain(|&t| t != term);
        }
        self.terms[term.as_raw() as usize].net = Some(net);
        self.nets[net.as_raw() as usize].terms.push(term);
    }

    /// Appends a wire description to a net.
    pub fn add_wire(&mut self, net: NetId, wire: Wire) {
        self.nets[net.as_raw() as usize].wires.push(wire);
    }

    /// Returns the master with the given ID.
    pub fn master(&self, id: MasterId) -> &Master {
        &self.masters[id.as_raw() as usize]
    }

    /// Returns the instance with the given ID.
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.as_raw() as usize]
    }

    /// Returns the terminal with the given ID.
    pub fn term(&self, id: InstTermId) -> &InstTerm {
        &self.terms[id.as_raw() as usize]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the net with the given ID.
    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.as_raw() as usize]
    }

    /// Looks up a net by name.
    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Looks up a master by name.
    pub fn find_master(&self, name: &str) -> Option<MasterId> {
        self.master_by_name.get(name).copied()
    }

    /// Looks up an instance by name.
    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.instance_by_name.get(name).copied()
    }

    /// Resolves `instance`/`pin` to a terminal.
    pub fn find_term(&self, instance: &str, pin: &str) -> Result<InstTermId, DbError> {
        let unknown = || DbError::UnknownTerminal(format!("{instance}/{pin}"));
        let inst = self.instance(self.find_instance(instance).ok_or_else(unknown)?);
        let master = self.master(inst.master);
        let index = master
            .pins
            .iter()
            .position(|p| p.name == pin)
            .ok_or_else(unknown)?;
        Ok(inst.terms[index])
    }

    /// Returns the master pin behind a terminal.
    pub fn term_pin(&self, term: InstTermId) -> &MasterPin {
        let t = self.term(term);
        let master = self.instance(t.instance).master;
        &self.master(master).pins[t.pin]
    }

    /// Returns the gate area of a terminal in square microns.
    pub fn gate_area(&self, term: InstTermId) -> f64 {
        self.term_pin(term).gate_area
    }

    /// Returns the diffusion area of a terminal in square microns.
    pub fn diff_area(&self, term: InstTermId) -> f64 {
        self.term_pin(term).diff_area
    }

    /// Returns `true` if the terminal is a transistor gate input.
    pub fn is_gate(&self, term: InstTermId) -> bool {
        self.term_pin(term).is_gate()
    }

    /// Returns a terminal's `instance/pin` name.
    pub fn term_name(&self, term: InstTermId) -> String {
        let t = self.term(term);
        format!(
            "{}/{}",
            self.instance(t.instance).name,
            self.term_pin(term).name
        )
    }

    /// Returns the nets that carry at least one non-empty wire.
    pub fn routed_nets(&self) -> impl Iterator<Item = &Net> + '_ {
        self.nets.iter().filter(|n| n.is_routed())
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Rebuilds auxiliary indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.tech.rebuild_indices();
        self.master_by_name = self
            .masters
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), MasterId::from_raw(i as u32)))
            .collect();
        self.instance_by_name = self
            .instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.name.clone(), InstanceId::from_raw(i as u32)))
            .collect();
        self.net_by_name = self
            .nets
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), NetId::from_raw(i as u32)))
            .collect();
    }

    /// Checks that every stored ID points inside its arena.
    pub fn validate(&self) -> Result<(), DbError> {
        self.tech.validate()?;
        let dangling = |what: String| Err(DbError::DanglingReference(what));
        for inst in &self.instances {
            let Some(master) = self.masters.get(inst.master.as_raw() as usize) else {
                return dangling(format!("instance '{}' master", inst.name));
            };
            if inst.terms.len() != master.pins.len()
                || inst.terms.iter().any(|t| t.as_raw() as usize >= self.terms.len())
            {
                return dangling(format!("instance '{}' terminals", inst.name));
            }
        }
        for term in &self.terms {
            let Some(inst) = self.instances.get(term.instance.as_raw() as usize) else {
                return dangling(format!("terminal {} instance", term.id));
            };
            if term.pin >= self.master(inst.master).pins.len() {
                return dangling(format!("terminal {} pin", term.id));
            }
        }
        for net in &self.nets {
            if net.terms.iter().any(|t| t.as_raw() as usize >= self.terms.len()) {
                return dangling(format!("net '{}' terminals", net.name));
            }
        }
        Ok(())
    }
}

/// Direction of a master pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    /// Input pin.
    Input,
    /// Output pin.
    Output,
    /// Bidirectional pin.
    Inout,
}

/// A library cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Master {
    /// Unique ID of this master.
    pub id: MasterId,
    /// Cell name.
    pub name: String,
    /// Pins in declaration order.
    pub pins: Vec<MasterPin>,
}

impl Master {
    /// Returns the largest diffusion area among this master's pins.
    pub fn max_diff_area(&self) -> f64 {
        self.pins.iter().map(|p| p.diff_area).fold(0.0, f64::max)
    }
}

/// A pin of a library cell with its antenna-relevant areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterPin {
    /// Pin name.
    pub name: String,
    /// Pin direction.
    pub direction: PinDirection,
    /// Connected gate area in square microns.
    #[serde(default)]
    pub gate_area: f64,
    /// Connected diffusion area in square microns.
    #[serde(default)]
    pub diff_area: f64,
}

impl MasterPin {
    /// Creates an input pin driving a transistor gate.
    pub fn gate(name: &str, gate_area: f64) -> Self {
        Self {
            name: name.to_string(),
            direction: PinDirection::Input,
            gate_area,
            diff_area: 0.0,
        }
    }

    /// Creates an output pin with diffusion area.
    pub fn output(name: &str, diff_area: f64) -> Self {
        Self {
            name: name.to_string(),
            direction: PinDirection::Output,
            gate_area: 0.0,
            diff_area,
        }
    }

    /// Returns `true` if this pin is an input driving a transistor gate.
    pub fn is_gate(&self) -> bool {
        self.direction == PinDirection::Input && self.gate_area > 0.0
    }
}

/// A placed cell instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Unique ID of this instance.
    pub id: InstanceId,
    /// Instance name.
    pub name: String,
    /// The library master.
    pub master: MasterId,
    /// Placement origin in dbu.
    pub location: Point,
    /// Terminals, one per master pin, in pin order.
    pub terms: Vec<InstTermId>,
}

/// A pin of a placed instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstTerm {
    /// Unique ID of this terminal.
    pub id: InstTermId,
    /// The owning instance.
    pub instance: InstanceId,
    /// Index into the master's pin list.
    pub pin: usize,
    /// The net this terminal is connected to.
    pub net: Option<NetId>,
}

/// An electrical net.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// Unique ID of this net.
    pub id: NetId,
    /// Net name.
    pub name: String,
    /// Connected instance terminals.
    pub terms: Vec<InstTermId>,
    /// Physical wires, one per wire object of the net.
    #[serde(default)]
    pub wires: Vec<Wire>,
    /// Power/ground nets are special and are not antenna checked.
    #[serde(default)]
    pub special: bool,
}

impl Net {
    /// Returns `true` if the net has any wiring.
    pub fn is_routed(&self) -> bool {
        self.wires.iter().any(|w| !w.is_empty())
    }
}
