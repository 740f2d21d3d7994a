//! Flattener: inline every module instance into a single netlist with one
//! global wire-index space.
//!
//! Names are rewritten to integer indices as instances are inlined under
//! dotted prefixes (`alu.carry.q`). Several names may map to one index: an
//! instance's first output shares the index of the instance base wire, and a
//! callee output shares the index of the caller wire it feeds. Registration
//! happens in phases so that forward references (`alu.z` used before the
//! `alu = alu8(…)` statement) resolve to the right index before any node is
//! emitted.

use std::collections::HashMap;

use log::debug;

use crate::wire::error::FlattenError;
use crate::wire::netlist::{Netlist, Node};

/// Instantiation depth bound; trips on recursive module calls.
const MAX_DEPTH: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct FlatPort {
    pub name: String,
    pub index: usize,
    pub width: u32,
}

/// A primitive node with all wires resolved to indices and masks precomputed.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatNode {
    Const {
        out: usize,
        value: u32,
    },
    Nand {
        out: usize,
        a: usize,
        b: usize,
        mask: u32,
    },
    Dff {
        out: usize,
        d: usize,
        clk: usize,
    },
    Index {
        out: usize,
        input: usize,
        bit: u32,
    },
    Slice {
        out: usize,
        input: usize,
        start: u32,
        mask: u32,
    },
    /// Inputs leftmost-first; the leftmost occupies the most significant bits.
    Concat {
        out: usize,
        inputs: Vec<(usize, u32)>,
    },
    Ram {
        out: usize,
        addr: usize,
        data: usize,
        write: usize,
        clk: usize,
        addr_width: u32,
    },
    Rom {
        out: usize,
        addr: usize,
        addr_width: u32,
    },
}

impl FlatNode {
    pub fn out(&self) -> usize {
        match self {
            Self::Const { out, .. }
            | Self::Nand { out, .. }
            | Self::Dff { out, .. }
            | Self::Index { out, .. }
            | Self::Slice { out, .. }
            | Self::Concat { out, .. }
            | Self::Ram { out, .. }
            | Self::Rom { out, .. } => *out,
        }
    }

    /// Input wire indices, for dependency analysis.
    pub fn inputs(&self) -> Vec<usize> {
        match self {
            Self::Const { .. } => vec![],
            Self::Nand { a, b, .. } => vec![*a, *b],
            Self::Dff { d, clk, .. } => vec![*d, *clk],
            Self::Index { input, .. } | Self::Slice { input, .. } => vec![*input],
            Self::Concat { inputs, .. } => inputs.iter().map(|(i, _)| *i).collect(),
            Self::Ram {
                addr,
                data,
                write,
                clk,
                ..
            } => vec![*addr, *data, *write, *clk],
            Self::Rom { addr, .. } => vec![*addr],
        }
    }
}

/// The flattened design: primitive nodes only, wires as indices.
#[derive(Debug, Clone, Default)]
pub struct FlatCircuit {
    pub wire_count: usize,
    /// Canonical dotted name → index. Several names may share an index.
    pub wire_names: HashMap<String, usize>,
    pub wire_widths: Vec<u32>,
    pub inputs: Vec<FlatPort>,
    pub outputs: Vec<FlatPort>,
    pub nodes: Vec<FlatNode>,
    /// Positions in `nodes` of state-bearing elements.
    pub dff_nodes: Vec<usize>,
    pub ram_nodes: Vec<usize>,
    pub rom_nodes: Vec<usize>,
}

impl FlatCircuit {
    pub fn wire(&self, name: &str) -> Option<usize> {
        self.wire_names.get(name).copied()
    }
}

pub fn flatten(
    modules: &HashMap<String, Netlist>,
    top: &str,
) -> Result<FlatCircuit, FlattenError> {
    let top_net = modules
        .get(top)
        .ok_or_else(|| FlattenError {
            message: format!("unknown module '{top}'"),
        })?;

    let mut flattener = Flattener {
        modules,
        wire_names: HashMap::new(),
        wire_widths: Vec::new(),
        nodes: Vec::new(),
        depth: 0,
    };

    // Top-level inputs take the first indices so they exist before any node
    // references them.
    let mut inputs = Vec::new();
    for port in &top_net.inputs {
        let index = flattener.get_or_alloc(&port.name, port.width);
        inputs.push(FlatPort {
            name: port.name.clone(),
            index,
            width: port.width,
        });
    }

    flattener.inline(top_net, "")?;

    // Re-register each top-level output under its declared name so lookups
    // by port name hit the wire the module body actually drives.
    let mut outputs = Vec::new();
    for port in &top_net.outputs {
        let resolved = flattener.resolve_local(top_net, &port.name)?;
        let index = flattener.get_or_alloc(&resolved, port.width);
        flattener.wire_names.insert(port.name.clone(), index);
        outputs.push(FlatPort {
            name: port.name.clone(),
            index,
            width: port.width,
        });
    }

    let mut circuit = FlatCircuit {
        wire_count: flattener.wire_widths.len(),
        wire_names: flattener.wire_names,
        wire_widths: flattener.wire_widths,
        inputs,
        outputs,
        nodes: flattener.nodes,
        dff_nodes: Vec::new(),
        ram_nodes: Vec::new(),
        rom_nodes: Vec::new(),
    };
    for (i, node) in circuit.nodes.iter().enumerate() {
        match node {
            FlatNode::Dff { .. } => circuit.dff_nodes.push(i),
            FlatNode::Ram { .. } => circuit.ram_nodes.push(i),
            FlatNode::Rom { .. } => circuit.rom_nodes.push(i),
            _ => {}
        }
    }

    debug!(
        "flattened '{top}': {} wires, {} nodes ({} dff, {} ram, {} rom)",
        circuit.wire_count,
        circuit.nodes.len(),
        circuit.dff_nodes.len(),
        circuit.ram_nodes.len(),
        circuit.rom_nodes.len(),
    );
    Ok(circuit)
}

struct Flattener<'a> {
    modules: &'a HashMap<String, Netlist>,
    wire_names: HashMap<String, usize>,
    wire_widths: Vec<u32>,
    nodes: Vec<FlatNode>,
    depth: u32,
}

impl<'a> Flattener<'a> {
    fn err(&self, message: String) -> FlattenError {
        FlattenError { message }
    }

    fn get_or_alloc(&mut self, name: &str, width: u32) -> usize {
        if let Some(&index) = self.wire_names.get(name) {
            return index;
        }
        let index = self.wire_widths.len();
        self.wire_widths.push(width.max(1));
        self.wire_names.insert(name.to_string(), index);
        index
    }

    fn set_width(&mut self, index: usize, width: u32) {
        self.wire_widths[index] = width.max(1);
    }

    fn full(prefix: &str, local: &str) -> String {
        if prefix.is_empty() {
            local.to_string()
        } else {
            format!("{prefix}{local}")
        }
    }

    fn resolve_local(&self, net: &Netlist, name: &str) -> Result<String, FlattenError> {
        net.resolve(name)
            .map(str::to_string)
            .ok_or_else(|| self.err(format!("alias cycle involving '{name}'")))
    }

    /// Wire index of a local name under `prefix`. Pre-registration
    /// guarantees every name a node references is already mapped.
    fn index_of(
        &self,
        net: &Netlist,
        prefix: &str,
        name: &str,
    ) -> Result<usize, FlattenError> {
        let resolved = self.resolve_local(net, name)?;
        let full = Self::full(prefix, &resolved);
        self.wire_names
            .get(&full)
            .copied()
            .ok_or_else(|| self.err(format!("unresolved wire '{full}'")))
    }

    fn inline(&mut self, net: &Netlist, prefix: &str) -> Result<(), FlattenError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.err(format!(
                "instantiation deeper than {MAX_DEPTH} levels (recursive module?)"
            )));
        }

        self.register_wires(net, prefix)?;

        // Module instances first: instantiation creates the output wires
        // that primitives reference, so forward references resolve before
        // any primitive captures an index.
        for node in &net.nodes {
            if let Node::Module {
                out, callee, args, ..
            } = node
            {
                self.inline_instance(net, prefix, out, callee, args)?;
            }
        }
        for node in &net.nodes {
            if !matches!(node, Node::Module { .. }) {
                self.emit_primitive(net, prefix, node)?;
            }
        }

        self.depth -= 1;
        Ok(())
    }

    /// Phase 0: register every wire of `net` under `prefix` before emitting
    /// nodes, so that references in any order land on the right index.
    fn register_wires(&mut self, net: &Netlist, prefix: &str) -> Result<(), FlattenError> {
        let mut names: Vec<&String> = net.wires.keys().collect();
        names.sort();

        // Pass 1: plain wire names whose alias chain ends at a plain wire.
        // Names resolving to a dotted wire wait for pass 3.
        let mut deferred = Vec::new();
        for name in &names {
            if name.contains('.') {
                continue;
            }
            let resolved = self.resolve_local(net, name)?;
            if resolved.contains('.') {
                deferred.push((name.as_str(), resolved));
                continue;
            }
            let width = net
                .wires
                .get(&resolved)
                .copied()
                .unwrap_or(net.wires[*name]);
            let index = self.get_or_alloc(&Self::full(prefix, &resolved), width);
            if resolved != **name {
                self.wire_names
                    .insert(Self::full(prefix, name), index);
            }
        }

        // Pass 2: dotted wires (`base.field`) unify with the instance that
        // produces them: the callee's first output is the instance base wire
        // itself, later outputs get their own canonical wire, and an output
        // aliased to a callee input is the caller's arg wire directly.
        for name in &names {
            let Some((base, field)) = name.rsplit_once('.') else {
                continue;
            };
            let rbase = self.resolve_local(net, base)?;
            let Some(Node::Module { callee, args, .. }) = net.instance_node(&rbase) else {
                return Err(self.err(format!(
                    "member access on '{base}', which is not a module instance"
                )));
            };
            let callee_net = self.modules.get(callee).ok_or_else(|| {
                self.err(format!("unknown module '{callee}'"))
            })?;
            let port = callee_net
                .outputs
                .iter()
                .find(|p| p.name == field)
                .ok_or_else(|| {
                    self.err(format!("module '{callee}' has no output '{field}'"))
                })?;

            let index = match self.passthrough_arg(net, prefix, callee_net, field, args)? {
                Some(index) => index,
                None => {
                    let canonical = if field == callee_net.outputs[0].name {
                        Self::full(prefix, &rbase)
                    } else {
                        Self::full(prefix, &format!("{rbase}.{field}"))
                    };
                    let index = self.get_or_alloc(&canonical, port.width);
                    self.set_width(index, port.width);
                    index
                }
            };
            let full = Self::full(prefix, name);
            if self.wire_names.get(&full) != Some(&index) {
                self.wire_names.insert(full, index);
            }
        }

        // Pass 3: plain names aliased to dotted wires, now that the dotted
        // targets are canonical.
        for (name, resolved) in deferred {
            let full_resolved = Self::full(prefix, &resolved);
            let index = match self.wire_names.get(&full_resolved) {
                Some(&index) => index,
                None => {
                    let width = net.wires.get(&resolved).copied().unwrap_or(1);
                    self.get_or_alloc(&full_resolved, width)
                }
            };
            self.wire_names.insert(Self::full(prefix, name), index);
        }

        // Instance base wires carry the callee's first output; settle their
        // widths (and passthrough identities) before any arg-width check or
        // mask computation.
        for node in &net.nodes {
            if let Node::Module { out, callee, args, .. } = node
                && let Some(callee_net) = self.modules.get(callee)
            {
                let resolved = self.resolve_local(net, out)?;
                let first = &callee_net.outputs[0];
                let full = Self::full(prefix, &resolved);
                match self.passthrough_arg(net, prefix, callee_net, &first.name, args)? {
                    Some(index) => {
                        self.wire_names.insert(full, index);
                    }
                    None => {
                        let index = self.get_or_alloc(&full, first.width);
                        self.set_width(index, first.width);
                    }
                }
            }
        }

        Ok(())
    }

    /// If callee output `field` resolves to one of the callee's inputs
    /// (whole-wire passthrough), the caller's arg wire IS that output;
    /// return its index so names unify before anything captures a stale
    /// one.
    fn passthrough_arg(
        &mut self,
        net: &Netlist,
        prefix: &str,
        callee_net: &Netlist,
        field: &str,
        args: &[String],
    ) -> Result<Option<usize>, FlattenError> {
        let resolved = self.resolve_local(callee_net, field)?;
        let Some(pos) = callee_net.inputs.iter().position(|p| p.name == resolved) else {
            return Ok(None);
        };
        // Arity mismatches are reported when the instance is inlined.
        let Some(arg) = args.get(pos) else {
            return Ok(None);
        };
        let arg_resolved = self.resolve_local(net, arg)?;
        let width = net.wires.get(&arg_resolved).copied().unwrap_or(1);
        Ok(Some(
            self.get_or_alloc(&Self::full(prefix, &arg_resolved), width),
        ))
    }

    fn inline_instance(
        &mut self,
        caller: &Netlist,
        prefix: &str,
        base: &str,
        callee: &str,
        args: &[String],
    ) -> Result<(), FlattenError> {
        let callee_net = self
            .modules
            .get(callee)
            .ok_or_else(|| self.err(format!("unknown module '{callee}'")))?;
        if args.len() != callee_net.inputs.len() {
            return Err(self.err(format!(
                "module '{callee}' expects {} arguments, got {}",
                callee_net.inputs.len(),
                args.len()
            )));
        }

        let rbase = self.resolve_local(caller, base)?;
        let new_prefix = format!("{}.", Self::full(prefix, &rbase));

        // Bind each arg wire to the callee input name under the new prefix,
        // so the callee reads straight from the caller's wires.
        for (arg, port) in args.iter().zip(&callee_net.inputs) {
            let arg_index = self.index_of(caller, prefix, arg)?;
            let arg_width = self.wire_widths[arg_index];
            if arg_width != port.width {
                return Err(self.err(format!(
                    "argument '{arg}' of '{callee}' has width {arg_width}, \
                     input '{}' expects {}",
                    port.name, port.width
                )));
            }
            self.wire_names
                .insert(format!("{new_prefix}{}", port.name), arg_index);
        }

        // Pre-map outputs: the callee's producers write directly into the
        // caller's wires. A callee output aliased to one of its inputs
        // (passthrough) re-points the caller wire at the bound input.
        for (k, port) in callee_net.outputs.iter().enumerate() {
            let target = if k == 0 {
                Self::full(prefix, &rbase)
            } else {
                Self::full(prefix, &format!("{rbase}.{}", port.name))
            };
            let resolved = self.resolve_local(callee_net, &port.name)?;
            let callee_full = format!("{new_prefix}{resolved}");

            if let Some(&index) = self.wire_names.get(&callee_full) {
                self.wire_names.insert(target, index);
                if resolved != port.name {
                    self.wire_names
                        .insert(format!("{new_prefix}{}", port.name), index);
                }
            } else {
                let index = self.get_or_alloc(&target, port.width);
                self.set_width(index, port.width);
                self.wire_names.insert(callee_full, index);
                if resolved != port.name {
                    self.wire_names
                        .insert(format!("{new_prefix}{}", port.name), index);
                }
            }
        }

        self.inline(callee_net, &new_prefix)?;

        // Unify once more after inlining, in case an output alias chain was
        // only settled while the callee's own wires were registered.
        for (k, port) in callee_net.outputs.iter().enumerate() {
            let target = if k == 0 {
                Self::full(prefix, &rbase)
            } else {
                Self::full(prefix, &format!("{rbase}.{}", port.name))
            };
            let resolved = self.resolve_local(callee_net, &port.name)?;
            let callee_full = format!("{new_prefix}{resolved}");
            if let Some(&index) = self.wire_names.get(&callee_full) {
                self.wire_names.insert(target, index);
            }
        }

        Ok(())
    }

    fn emit_primitive(
        &mut self,
        net: &Netlist,
        prefix: &str,
        node: &Node,
    ) -> Result<(), FlattenError> {
        let flat = match node {
            Node::Const { out, value, .. } => {
                let out = self.index_of(net, prefix, out)?;
                FlatNode::Const {
                    out,
                    value: value & width_mask(self.wire_widths[out]),
                }
            }
            Node::Nand { out, a, b, .. } => {
                let out = self.index_of(net, prefix, out)?;
                FlatNode::Nand {
                    out,
                    a: self.index_of(net, prefix, a)?,
                    b: self.index_of(net, prefix, b)?,
                    mask: width_mask(self.wire_widths[out]),
                }
            }
            Node::Dff { out, d, clk, .. } => FlatNode::Dff {
                out: self.index_of(net, prefix, out)?,
                d: self.index_of(net, prefix, d)?,
                clk: self.index_of(net, prefix, clk)?,
            },
            Node::Index { out, input, bit } => FlatNode::Index {
                out: self.index_of(net, prefix, out)?,
                input: self.index_of(net, prefix, input)?,
                bit: *bit,
            },
            Node::Slice {
                out,
                input,
                start,
                end,
            } => FlatNode::Slice {
                out: self.index_of(net, prefix, out)?,
                input: self.index_of(net, prefix, input)?,
                start: *start,
                mask: width_mask(end - start + 1),
            },
            Node::Concat { out, inputs, .. } => {
                let mut flat_inputs = Vec::with_capacity(inputs.len());
                for input in inputs {
                    let index = self.index_of(net, prefix, input)?;
                    flat_inputs.push((index, self.wire_widths[index]));
                }
                FlatNode::Concat {
                    out: self.index_of(net, prefix, out)?,
                    inputs: flat_inputs,
                }
            }
            Node::Ram {
                out,
                addr,
                data,
                write,
                clk,
                ..
            } => {
                let addr = self.index_of(net, prefix, addr)?;
                FlatNode::Ram {
                    out: self.index_of(net, prefix, out)?,
                    addr,
                    data: self.index_of(net, prefix, data)?,
                    write: self.index_of(net, prefix, write)?,
                    clk: self.index_of(net, prefix, clk)?,
                    addr_width: self.wire_widths[addr],
                }
            }
            Node::Rom { out, addr, .. } => {
                let addr = self.index_of(net, prefix, addr)?;
                FlatNode::Rom {
                    out: self.index_of(net, prefix, out)?,
                    addr,
                    addr_width: self.wire_widths[addr],
                }
            }
            Node::Module { .. } => return Ok(()),
        };
        self.nodes.push(flat);
        Ok(())
    }
}

pub(crate) fn width_mask(width: u32) -> u32 {
    if width >= 32 { u32::MAX } else { (1 << width) - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::compiler::compile;
    use crate::wire::lexer::tokenize;
    use crate::wire::parser::parse;

    fn flatten_src(src: &str, top: &str) -> FlatCircuit {
        let modules = compile(&parse(&tokenize(src).unwrap()).unwrap()).unwrap();
        flatten(&modules, top).unwrap()
    }

    #[test]
    fn single_module_flattens_unchanged() {
        let circuit = flatten_src("module not_gate(a) -> out: out = nand(a, a)", "not_gate");
        assert_eq!(circuit.nodes.len(), 1);
        assert_eq!(circuit.inputs.len(), 1);
        assert_eq!(circuit.outputs.len(), 1);
        let a = circuit.wire("a").unwrap();
        let out = circuit.wire("out").unwrap();
        assert!(matches!(
            circuit.nodes[0],
            FlatNode::Nand { out: o, a: x, b: y, mask: 1 } if o == out && x == a && y == a
        ));
    }

    #[test]
    fn instance_wires_get_dotted_names() {
        let src = "module inv(a) -> out: out = nand(a, a)\n\
                   module t(x) -> out: out = inv(x)\n";
        let circuit = flatten_src(src, "t");
        // The callee input binds to the caller's wire, no copy node; the
        // instance base wire is the assignment target.
        assert_eq!(circuit.wire("out.a"), circuit.wire("x"));
        assert!(circuit.wire("out").is_some());
        assert_eq!(circuit.nodes.len(), 1);
    }

    #[test]
    fn two_levels_of_hierarchy() {
        let src = "module inv(a) -> out: out = nand(a, a)\n\
                   module buf2(a) -> out:\n  n = inv(a)\n  out = inv(n)\n\
                   module t(x) -> out: out = buf2(x)\n";
        let circuit = flatten_src(src, "t");
        assert_eq!(circuit.nodes.len(), 2);
        // Chain: x -> nand -> n -> nand -> out.
        let x = circuit.wire("x").unwrap();
        let out = circuit.wire("out").unwrap();
        let n = circuit.wire("out.n").unwrap();
        assert!(circuit.nodes.iter().any(
            |node| matches!(node, FlatNode::Nand { out: o, a, .. } if *o == n && *a == x)
        ));
        assert!(circuit.nodes.iter().any(
            |node| matches!(node, FlatNode::Nand { out: o, a, .. } if *o == out && *a == n)
        ));
    }

    #[test]
    fn secondary_output_unifies_with_member_wire() {
        let src = "module pair(a) -> (x, y):\n  x = a\n  y = nand(a, a)\n\
                   module t(a) -> (p, q):\n  inst = pair(a)\n  p = inst\n  q = inst.y\n";
        let circuit = flatten_src(src, "t");
        // First output is a passthrough of the input.
        assert_eq!(circuit.wire("p"), circuit.wire("a"));
        // Secondary output wire is shared between caller and callee names.
        assert_eq!(circuit.wire("q"), circuit.wire("inst.y"));
        assert_eq!(circuit.nodes.len(), 1);
    }

    #[test]
    fn member_used_before_instantiation() {
        let src = "module pair(a) -> (x, y):\n  x = a\n  y = nand(a, a)\n\
                   module t(a) -> out:\n  out = nand(inst.y, inst.y)\n  inst = pair(a)\n";
        let circuit = flatten_src(src, "t");
        assert_eq!(circuit.nodes.len(), 2);
        let y = circuit.wire("inst.y").unwrap();
        let out = circuit.wire("out").unwrap();
        assert!(circuit.nodes.iter().any(
            |node| matches!(node, FlatNode::Nand { out: o, a, .. } if *o == out && *a == y)
        ));
    }

    #[test]
    fn arg_width_mismatch_is_an_error() {
        let src = "module w8(a:8) -> out:8: out = a\n\
                   module t(x:4) -> out:8: out = w8(x)\n";
        let modules = compile(&parse(&tokenize(src).unwrap()).unwrap()).unwrap();
        let err = flatten(&modules, "t").unwrap_err();
        assert!(err.message.contains("width 4"), "{}", err.message);
    }

    #[test]
    fn unknown_module_is_an_error() {
        let src = "module t(x) -> out: out = ghost(x)\n";
        let modules = compile(&parse(&tokenize(src).unwrap()).unwrap()).unwrap();
        let err = flatten(&modules, "t").unwrap_err();
        assert!(err.message.contains("unknown module 'ghost'"));
    }

    #[test]
    fn recursive_instantiation_is_an_error() {
        let src = "module t(x) -> out: out = t(x)\n";
        let modules = compile(&parse(&tokenize(src).unwrap()).unwrap()).unwrap();
        let err = flatten(&modules, "t").unwrap_err();
        assert!(err.message.contains("recursive"));
    }

    #[test]
    fn masks_are_precomputed() {
        let circuit = flatten_src(
            "module t(a:8, b:8) -> out:8: out = nand(a, b)",
            "t",
        );
        assert!(matches!(circuit.nodes[0], FlatNode::Nand { mask: 0xFF, .. }));
    }
}
