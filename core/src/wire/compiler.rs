//! Per-module netlist compiler.
//!
//! Statements compile into nodes and wires with inferred widths. Whole-wire
//! assignments (`x = y`, including `x = inst.field`) become aliases instead
//! of gates. References to wires assigned later in the module (feedback) and
//! to modules compiled later in the file are registered with a provisional
//! width; the flattener settles them, so width checks are skipped for
//! provisional operands rather than reported as false errors.

use std::collections::{HashMap, HashSet};

use crate::wire::ast::{Expr, Module, Statement};
use crate::wire::error::CompileError;
use crate::wire::netlist::{Netlist, Node};

/// Reserved function names; everything else called is a module.
const PRIMITIVES: &[&str] = &["nand", "dff", "ram", "rom", "concat"];

/// Compile every module in declaration order. Each module sees the modules
/// compiled before it; calls to later modules are checked at flatten time.
pub fn compile(modules: &[Module]) -> Result<HashMap<String, Netlist>, CompileError> {
    let mut compiled = HashMap::new();
    for module in modules {
        if PRIMITIVES.contains(&module.name.as_str()) {
            return Err(CompileError {
                message: format!("module name '{}' shadows a primitive", module.name),
                line: module.line,
            });
        }
        if compiled.contains_key(&module.name) {
            return Err(CompileError {
                message: format!("duplicate module '{}'", module.name),
                line: module.line,
            });
        }
        let netlist = ModuleCompiler::new(&compiled).compile(module)?;
        compiled.insert(module.name.clone(), netlist);
    }
    Ok(compiled)
}

fn min_width(value: u32) -> u32 {
    if value == 0 { 1 } else { 32 - value.leading_zeros() }
}

fn mask(width: u32) -> u32 {
    if width >= 32 { u32::MAX } else { (1 << width) - 1 }
}

struct ModuleCompiler<'a> {
    compiled: &'a HashMap<String, Netlist>,
    net: Netlist,
    /// Names a statement may legally reference: ports plus every statement
    /// target (forward references feed sequential loops).
    assignable: HashSet<String>,
    /// Wires whose width is not yet trustworthy (forward references and
    /// outputs of modules compiled later).
    provisional: HashSet<String>,
    input_ports: HashSet<String>,
    output_widths: HashMap<String, u32>,
    assigned: HashSet<String>,
    temp_count: u32,
}

impl<'a> ModuleCompiler<'a> {
    fn new(compiled: &'a HashMap<String, Netlist>) -> Self {
        Self {
            compiled,
            net: Netlist::default(),
            assignable: HashSet::new(),
            provisional: HashSet::new(),
            input_ports: HashSet::new(),
            output_widths: HashMap::new(),
            assigned: HashSet::new(),
            temp_count: 0,
        }
    }

    fn compile(mut self, module: &Module) -> Result<Netlist, CompileError> {
        self.net.name = module.name.clone();
        self.net.inputs = module.inputs.clone();
        self.net.outputs = module.outputs.clone();

        for port in &module.inputs {
            self.net.wires.insert(port.name.clone(), port.width);
            self.input_ports.insert(port.name.clone());
            self.assignable.insert(port.name.clone());
        }
        for port in &module.outputs {
            self.net.wires.insert(port.name.clone(), port.width);
            self.output_widths.insert(port.name.clone(), port.width);
            self.assignable.insert(port.name.clone());
        }
        for stmt in &module.statements {
            self.assignable.insert(stmt.target.clone());
        }

        for stmt in &module.statements {
            self.compile_statement(stmt)?;
        }

        for port in &module.outputs {
            if !self.assigned.contains(&port.name) {
                return Err(CompileError {
                    message: format!("output '{}' is never assigned", port.name),
                    line: module.line,
                });
            }
        }

        Ok(self.net)
    }

    fn err(&self, line: u32, message: String) -> CompileError {
        CompileError { message, line }
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        let target = stmt.target.clone();
        let line = stmt.line;

        if self.input_ports.contains(&target) {
            return Err(self.err(line, format!("cannot assign to input port '{target}'")));
        }
        if !self.assigned.insert(target.clone()) {
            return Err(self.err(line, format!("wire '{target}' is assigned twice")));
        }
        let declared = self.output_widths.get(&target).copied();

        match &stmt.expr {
            Expr::Ident(_) | Expr::Member { .. } => {
                let (source, width, known) = self.compile_expr(&stmt.expr, line)?;
                if let Some(declared_width) = declared {
                    if known && width != declared_width {
                        return Err(self.err(
                            line,
                            format!(
                                "cannot assign '{source}' (width {width}) to \
                                 '{target}' (width {declared_width})"
                            ),
                        ));
                    }
                    self.net.wires.insert(target.clone(), declared_width);
                    self.provisional.remove(&target);
                } else {
                    self.net.wires.insert(target.clone(), width);
                    if known {
                        self.provisional.remove(&target);
                    } else {
                        self.provisional.insert(target.clone());
                    }
                }
                self.net.aliases.insert(target, source);
            }
            Expr::Number(value) => {
                let width = declared.unwrap_or_else(|| min_width(*value));
                self.net.wires.insert(target.clone(), width);
                self.provisional.remove(&target);
                self.net.nodes.push(Node::Const {
                    out: target,
                    value: value & mask(width),
                    width,
                });
            }
            _ => {
                let (width, known) = self.compile_node_expr(target.clone(), &stmt.expr, line)?;
                if let Some(declared_width) = declared {
                    if known && width != declared_width {
                        return Err(self.err(
                            line,
                            format!(
                                "expression of width {width} assigned to \
                                 '{target}' of width {declared_width}"
                            ),
                        ));
                    }
                    self.net.wires.insert(target.clone(), declared_width);
                    self.provisional.remove(&target);
                } else {
                    self.net.wires.insert(target.clone(), width);
                    if known {
                        self.provisional.remove(&target);
                    } else {
                        self.provisional.insert(target.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Compile an expression to a wire reference, emitting nodes for any
    /// nested computation. Returns (wire name, width, width-is-known).
    fn compile_expr(
        &mut self,
        expr: &Expr,
        line: u32,
    ) -> Result<(String, u32, bool), CompileError> {
        match expr {
            Expr::Ident(name) => {
                let (width, known) = self.ident_width(name, line)?;
                Ok((name.clone(), width, known))
            }
            Expr::Member { base, field } => match base.as_ref() {
                Expr::Ident(instance) => self.member_ref(instance, field, line),
                _ => Err(self.err(
                    line,
                    format!("member access '.{field}' requires an instance name"),
                )),
            },
            Expr::Number(value) => {
                let out = self.fresh_temp();
                let width = min_width(*value);
                self.net.wires.insert(out.clone(), width);
                self.net.nodes.push(Node::Const {
                    out: out.clone(),
                    value: *value,
                    width,
                });
                Ok((out, width, true))
            }
            _ => {
                let out = self.fresh_temp();
                let (width, known) = self.compile_node_expr(out.clone(), expr, line)?;
                Ok((out, width, known))
            }
        }
    }

    /// Compile a call/index/slice expression into a node producing `out`.
    fn compile_node_expr(
        &mut self,
        out: String,
        expr: &Expr,
        line: u32,
    ) -> Result<(u32, bool), CompileError> {
        let (width, known) = match expr {
            Expr::Call { callee, args } => match callee.as_str() {
                "nand" => {
                    self.check_arity("nand", args.len(), 2, line)?;
                    let (a, wa, ka) = self.compile_expr(&args[0], line)?;
                    let (b, wb, kb) = self.compile_expr(&args[1], line)?;
                    if ka && kb && wa != wb {
                        return Err(self.err(
                            line,
                            format!("nand operand widths differ ({wa} vs {wb})"),
                        ));
                    }
                    let width = wa.max(wb);
                    self.net.nodes.push(Node::Nand {
                        out: out.clone(),
                        a,
                        b,
                        width,
                    });
                    (width, ka && kb)
                }
                "dff" => {
                    self.check_arity("dff", args.len(), 2, line)?;
                    let (d, wd, kd) = self.compile_expr(&args[0], line)?;
                    let (clk, wc, kc) = self.compile_expr(&args[1], line)?;
                    if kc && wc != 1 {
                        return Err(self.err(line, "dff clock must be 1 bit wide".into()));
                    }
                    self.net.nodes.push(Node::Dff {
                        out: out.clone(),
                        d,
                        clk,
                        width: wd,
                    });
                    (wd, kd)
                }
                "ram" => {
                    self.check_arity("ram", args.len(), 4, line)?;
                    let (addr, wa, _) = self.compile_expr(&args[0], line)?;
                    let (data, _, _) = self.compile_expr(&args[1], line)?;
                    let (write, ww, kw) = self.compile_expr(&args[2], line)?;
                    let (clk, wc, kc) = self.compile_expr(&args[3], line)?;
                    if kw && ww != 1 {
                        return Err(self.err(line, "ram write enable must be 1 bit wide".into()));
                    }
                    if kc && wc != 1 {
                        return Err(self.err(line, "ram clock must be 1 bit wide".into()));
                    }
                    self.net.nodes.push(Node::Ram {
                        out: out.clone(),
                        addr,
                        data,
                        write,
                        clk,
                        addr_width: wa,
                    });
                    (8, true)
                }
                "rom" => {
                    self.check_arity("rom", args.len(), 1, line)?;
                    let (addr, wa, _) = self.compile_expr(&args[0], line)?;
                    self.net.nodes.push(Node::Rom {
                        out: out.clone(),
                        addr,
                        addr_width: wa,
                    });
                    (8, true)
                }
                "concat" => {
                    if args.is_empty() {
                        return Err(
                            self.err(line, "concat expects at least 1 argument".into())
                        );
                    }
                    let mut inputs = Vec::with_capacity(args.len());
                    let mut width = 0;
                    let mut known = true;
                    for arg in args {
                        let (wire, w, k) = self.compile_expr(arg, line)?;
                        inputs.push(wire);
                        width += w;
                        known &= k;
                    }
                    if known && width > 32 {
                        return Err(self.err(
                            line,
                            format!("concat result width {width} exceeds 32 bits"),
                        ));
                    }
                    self.net.nodes.push(Node::Concat {
                        out: out.clone(),
                        inputs,
                        width,
                    });
                    (width, known)
                }
                name => self.compile_module_call(out.clone(), name, args, line)?,
            },
            Expr::Index { base, bit } => {
                let (input, w, k) = self.compile_expr(base, line)?;
                if k && *bit >= w {
                    return Err(self.err(
                        line,
                        format!("bit index {bit} out of range for width {w}"),
                    ));
                }
                self.net.nodes.push(Node::Index {
                    out: out.clone(),
                    input,
                    bit: *bit,
                });
                (1, true)
            }
            Expr::Slice { base, start, end } => {
                let (input, w, k) = self.compile_expr(base, line)?;
                if start > end || (k && *end >= w) {
                    return Err(self.err(
                        line,
                        format!("invalid slice range [{start}:{end}] for width {w}"),
                    ));
                }
                self.net.nodes.push(Node::Slice {
                    out: out.clone(),
                    input,
                    start: *start,
                    end: *end,
                });
                (end - start + 1, true)
            }
            _ => {
                return Err(self.err(line, "expression does not produce a wire".into()));
            }
        };
        self.net.wires.insert(out, width);
        Ok((width, known))
    }

    fn compile_module_call(
        &mut self,
        out: String,
        callee: &str,
        args: &[Expr],
        line: u32,
    ) -> Result<(u32, bool), CompileError> {
        let mut wires = Vec::with_capacity(args.len());
        for arg in args {
            let (wire, _, _) = self.compile_expr(arg, line)?;
            wires.push(wire);
        }
        // A callee compiled earlier in the file is checked now; a later one
        // is checked when the flattener inlines it.
        let (width, known) = match self.compiled.get(callee) {
            Some(net) => {
                if net.inputs.len() != args.len() {
                    return Err(self.err(
                        line,
                        format!(
                            "module '{callee}' expects {} arguments, got {}",
                            net.inputs.len(),
                            args.len()
                        ),
                    ));
                }
                (net.outputs[0].width, true)
            }
            None => (1, false),
        };
        self.net.nodes.push(Node::Module {
            out,
            callee: callee.to_string(),
            args: wires,
            line,
        });
        Ok((width, known))
    }

    fn check_arity(
        &self,
        what: &str,
        got: usize,
        want: usize,
        line: u32,
    ) -> Result<(), CompileError> {
        if got != want {
            Err(self.err(
                line,
                format!("{what} expects {want} arguments, got {got}"),
            ))
        } else {
            Ok(())
        }
    }

    fn ident_width(&mut self, name: &str, line: u32) -> Result<(u32, bool), CompileError> {
        if let Some(&width) = self.net.wires.get(name) {
            return Ok((width, !self.provisional.contains(name)));
        }
        if self.assignable.contains(name) {
            // Referenced before its assignment (feedback); settled when the
            // assignment compiles.
            self.net.wires.insert(name.to_string(), 1);
            self.provisional.insert(name.to_string());
            return Ok((1, false));
        }
        Err(self.err(line, format!("undeclared identifier '{name}'")))
    }

    fn member_ref(
        &mut self,
        instance: &str,
        field: &str,
        line: u32,
    ) -> Result<(String, u32, bool), CompileError> {
        let resolved = self
            .net
            .resolve(instance)
            .ok_or_else(|| self.err(line, format!("alias cycle involving '{instance}'")))?
            .to_string();
        let dotted = format!("{resolved}.{field}");

        if let Some(&width) = self.net.wires.get(&dotted) {
            return Ok((dotted.clone(), width, !self.provisional.contains(&dotted)));
        }

        let callee = match self.net.instance_node(&resolved) {
            Some(Node::Module { callee, .. }) => Some(callee.clone()),
            _ => None,
        };
        if let Some(callee) = callee {
            if let Some(callee_net) = self.compiled.get(&callee) {
                let port = callee_net
                    .outputs
                    .iter()
                    .find(|p| p.name == *field)
                    .ok_or_else(|| {
                        self.err(
                            line,
                            format!("module '{callee}' has no output '{field}'"),
                        )
                    })?;
                self.net.wires.insert(dotted.clone(), port.width);
                return Ok((dotted, port.width, true));
            }
        }

        // Instance not yet known (instantiated below, or callee compiled
        // later). Register provisionally; flattening unifies it.
        self.net.wires.insert(dotted.clone(), 1);
        self.provisional.insert(dotted.clone());
        Ok((dotted, 1, false))
    }

    fn fresh_temp(&mut self) -> String {
        let name = format!("_t{}", self.temp_count);
        self.temp_count += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::lexer::tokenize;
    use crate::wire::parser::parse;

    fn compile_src(src: &str) -> Result<HashMap<String, Netlist>, CompileError> {
        compile(&parse(&tokenize(src).unwrap()).unwrap())
    }

    #[test]
    fn not_gate_compiles_to_one_nand() {
        let modules = compile_src("module not_gate(a) -> out: out = nand(a, a)").unwrap();
        let net = &modules["not_gate"];
        assert_eq!(net.nodes.len(), 1);
        assert!(matches!(
            &net.nodes[0],
            Node::Nand { out, width: 1, .. } if out == "out"
        ));
        assert_eq!(net.wires["out"], 1);
    }

    #[test]
    fn bare_identifier_becomes_alias() {
        let modules = compile_src("module buf(a:8) -> out:8: out = a").unwrap();
        let net = &modules["buf"];
        assert!(net.nodes.is_empty());
        assert_eq!(net.aliases["out"], "a");
        assert_eq!(net.wires["out"], 8);
    }

    #[test]
    fn feedback_reference_resolves() {
        let src = "module c(clk) -> q:\n  next = nand(q, q)\n  q = dff(next, clk)\n";
        let net = &compile_src(src).unwrap()["c"];
        assert_eq!(net.nodes.len(), 2);
        assert_eq!(net.wires["q"], 1);
        assert_eq!(net.wires["next"], 1);
    }

    #[test]
    fn nested_expressions_use_temp_wires() {
        let src = "module t(a, b) -> out:\n  out = nand(nand(a, a), b)\n";
        let net = &compile_src(src).unwrap()["t"];
        assert_eq!(net.nodes.len(), 2);
        assert!(net.wires.contains_key("_t0"));
    }

    #[test]
    fn constant_takes_declared_width() {
        let src = "module t(a) -> out:8:\n  out = 5\n";
        let net = &compile_src(src).unwrap()["t"];
        assert!(matches!(
            &net.nodes[0],
            Node::Const { value: 5, width: 8, .. }
        ));
    }

    #[test]
    fn concat_width_is_sum_of_parts() {
        let src = "module t(a:4, b:4) -> out:8:\n  out = concat(a, b)\n";
        let net = &compile_src(src).unwrap()["t"];
        assert!(matches!(&net.nodes[0], Node::Concat { width: 8, .. }));
    }

    #[test]
    fn member_access_on_known_module() {
        let src = "module pair(a) -> (x, y):\n  x = a\n  y = nand(a, a)\n\
                   module t(a) -> out:\n  p = pair(a)\n  out = p.y\n";
        let net = &compile_src(src).unwrap()["t"];
        assert_eq!(net.aliases["out"], "p.y");
        assert_eq!(net.wires["p.y"], 1);
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let err = compile_src("module t(a) -> out: out = nand(a, ghost)").unwrap_err();
        assert!(err.message.contains("undeclared identifier 'ghost'"));
    }

    #[test]
    fn nand_width_mismatch_is_an_error() {
        let err =
            compile_src("module t(a:8, b:4) -> out:8: out = nand(a, b)").unwrap_err();
        assert!(err.message.contains("nand operand widths differ (8 vs 4)"));
    }

    #[test]
    fn invalid_slice_is_an_error() {
        let err = compile_src("module t(a:4) -> out: out = a[2:7]").unwrap_err();
        assert!(err.message.contains("invalid slice range"));
    }

    #[test]
    fn unknown_output_field_is_an_error() {
        let src = "module pair(a) -> (x, y):\n  x = a\n  y = a\n\
                   module t(a) -> out:\n  p = pair(a)\n  out = p.z\n";
        let err = compile_src(src).unwrap_err();
        assert!(err.message.contains("no output 'z'"));
    }

    #[test]
    fn assigning_an_input_is_an_error() {
        let err = compile_src("module t(a) -> out:\n  a = nand(a, a)\n  out = a\n")
            .unwrap_err();
        assert!(err.message.contains("cannot assign to input port 'a'"));
    }

    #[test]
    fn unassigned_output_is_an_error() {
        let err = compile_src("module t(a) -> (out, spare):\n  out = a\n").unwrap_err();
        assert!(err.message.contains("'spare' is never assigned"));
    }
}
