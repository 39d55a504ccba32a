//! Identifier resolution (§4.5 pass 5): classifies every `Operand::Ident`
//! as a register alias or a label reference once the full set of
//! declared names is known. Label *addresses* aren't needed for this —
//! only that a name exists — so this runs before the layout pass that
//! assigns coordinates, breaking the circularity between operand cell
//! counts (needed for layout) and label coordinates (needed to resolve
//! references).
//!
//! `.SCOPE`/`.ENDS` only guards against duplicate label names within a
//! region; references are still resolved by bare name against the
//! single flat namespace built here.

use std::collections::{BTreeMap, BTreeSet};

use crate::asm::ast::{Operand, Stmt};
use crate::asm::diagnostics::{Diagnostic, Diagnostics};
use crate::vm::organism::RegisterId;
use crate::vm::program::SourceLocation;

pub struct Declarations {
    pub aliases: BTreeMap<String, RegisterId>,
    pub labels: BTreeSet<String>,
    pub proc_params: BTreeMap<String, Vec<String>>,
}

pub fn collect_declarations(stmts: &[Stmt]) -> Declarations {
    let mut aliases = BTreeMap::new();
    let mut labels = BTreeSet::new();
    let mut proc_params = BTreeMap::new();
    for stmt in stmts {
        match stmt {
            Stmt::RegAlias(name, reg) => {
                aliases.insert(name.clone(), *reg);
            }
            Stmt::Label(name, _) => {
                labels.insert(name.clone());
            }
            Stmt::Proc { name, params, .. } => {
                labels.insert(name.clone());
                proc_params.insert(name.clone(), params.clone());
            }
            _ => {}
        }
    }
    Declarations { aliases, labels, proc_params }
}

pub fn resolve(stmts: &mut [Stmt], decls: &Declarations, diagnostics: &mut Diagnostics) {
    for stmt in stmts.iter_mut() {
        if let Stmt::Instruction(instr) = stmt {
            let loc = instr.loc.clone();
            for operand in instr.operands.iter_mut().chain(instr.with_bindings.iter_mut()) {
                resolve_operand(operand, decls, &loc, diagnostics);
            }
        }
    }
}

fn resolve_operand(operand: &mut Operand, decls: &Declarations, loc: &SourceLocation, diagnostics: &mut Diagnostics) {
    let Operand::Ident(name) = operand else { return };
    if let Some(reg) = decls.aliases.get(name) {
        *operand = Operand::Register(*reg);
    } else if decls.labels.contains(name) {
        *operand = Operand::LabelRef(name.clone());
    } else {
        diagnostics.push(Diagnostic::error(loc.clone(), format!("unresolved symbol `{name}`")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::ast::Instruction;
    use crate::vm::program::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation { file: "t.s".into(), line: 1 }
    }

    #[test]
    fn resolves_alias_and_label() {
        let stmts_for_decls = vec![
            Stmt::RegAlias("COUNTER".into(), RegisterId::Dr(0)),
            Stmt::Label("LOOP".into(), loc()),
        ];
        let decls = collect_declarations(&stmts_for_decls);

        let mut stmts = vec![Stmt::Instruction(Instruction {
            mnemonic: "JMPI".into(),
            operands: vec![Operand::Ident("LOOP".into())],
            with_bindings: vec![Operand::Ident("COUNTER".into())],
            loc: loc(),
        })];
        let mut diags = Diagnostics::default();
        resolve(&mut stmts, &decls, &mut diags);
        assert!(!diags.has_errors());
        let Stmt::Instruction(i) = &stmts[0] else { panic!() };
        assert_eq!(i.operands[0], Operand::LabelRef("LOOP".into()));
        assert_eq!(i.with_bindings[0], Operand::Register(RegisterId::Dr(0)));
    }

    #[test]
    fn unresolved_symbol_is_diagnosed() {
        let decls = collect_declarations(&[]);
        let mut stmts = vec![Stmt::Instruction(Instruction {
            mnemonic: "JMPI".into(),
            operands: vec![Operand::Ident("NOWHERE".into())],
            with_bindings: vec![],
            loc: loc(),
        })];
        let mut diags = Diagnostics::default();
        resolve(&mut stmts, &decls, &mut diags);
        assert!(diags.has_errors());
    }
}
