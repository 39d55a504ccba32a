//! Tokenize + parse (§4.5 pass 1): turns the flattened line stream into
//! [`Stmt`] nodes. Operand identifiers are left as `Operand::Ident`
//! until `asm::resolve` knows the full set of declared names.

use crate::asm::ast::{Instruction, Operand, Stmt};
use crate::asm::diagnostics::{Diagnostic, Diagnostics};
use crate::asm::lexer::{parse_int, parse_molecule_type, tokenize};
use crate::asm::preprocess::FlatItem;
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::organism::RegisterId;
use crate::vm::program::SourceLocation;

pub fn parse(items: Vec<FlatItem>, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    for item in items {
        match item {
            FlatItem::IncludeBegin => stmts.push(Stmt::IncludeBegin),
            FlatItem::IncludeEnd => stmts.push(Stmt::IncludeEnd),
            FlatItem::Line(line) => {
                let loc = SourceLocation { file: line.file, line: line.line };
                let tokens = tokenize(&line.text);
                if tokens.is_empty() {
                    continue;
                }
                parse_line(&tokens, loc, &mut stmts, diagnostics);
            }
        }
    }
    stmts
}

fn parse_line(tokens: &[String], loc: SourceLocation, out: &mut Vec<Stmt>, diagnostics: &mut Diagnostics) {
    let head = &tokens[0];
    if let Some(label_name) = head.strip_suffix(':') {
        out.push(Stmt::Label(label_name.to_string(), loc.clone()));
        if tokens.len() > 1 {
            parse_line(&tokens[1..], loc, out, diagnostics);
        }
        return;
    }

    if head.starts_with('.') {
        parse_directive(&head.to_ascii_uppercase(), &tokens[1..], loc, out, diagnostics);
        return;
    }

    let with_idx = tokens.iter().position(|t| t.eq_ignore_ascii_case(".WITH"));
    let (operand_tokens, with_tokens): (&[String], &[String]) = match with_idx {
        Some(i) => (&tokens[1..i], &tokens[i + 1..]),
        None => (&tokens[1..], &[]),
    };
    let operands = operand_tokens.iter().map(|t| parse_operand(t)).collect();
    let with_bindings = with_tokens.iter().map(|t| parse_operand(t)).collect();
    out.push(Stmt::Instruction(Instruction {
        mnemonic: head.to_ascii_uppercase(),
        operands,
        with_bindings,
        loc,
    }));
}

fn parse_directive(directive: &str, args: &[String], loc: SourceLocation, out: &mut Vec<Stmt>, diagnostics: &mut Diagnostics) {
    match directive {
        ".ORG" => match args.first().and_then(|t| parse_vector(t)) {
            Some(v) => out.push(Stmt::Org(v, loc)),
            None => diagnostics.push(Diagnostic::error(loc, "`.ORG` needs a vector literal")),
        },
        ".DIR" => match args.first().and_then(|t| parse_vector(t)) {
            Some(v) => out.push(Stmt::Dir(v, loc)),
            None => diagnostics.push(Diagnostic::error(loc, "`.DIR` needs a vector literal")),
        },
        ".REG" | ".PREG" => {
            let (Some(alias_name), Some(reg_tok)) = (args.first(), args.get(1)) else {
                diagnostics.push(Diagnostic::error(loc, format!("`{directive}` needs a name and a register")));
                return;
            };
            match parse_register(reg_tok) {
                Some(reg) => out.push(Stmt::RegAlias(alias_name.clone(), reg)),
                None => diagnostics.push(Diagnostic::error(loc, format!("`{reg_tok}` is not a register"))),
            }
        }
        ".SCOPE" => match args.first() {
            Some(n) => out.push(Stmt::Scope(n.clone())),
            None => diagnostics.push(Diagnostic::error(loc, "`.SCOPE` needs a name")),
        },
        ".ENDS" => out.push(Stmt::EndScope),
        ".PROC" => {
            let Some(proc_name) = args.first() else {
                diagnostics.push(Diagnostic::error(loc, "`.PROC` needs a name"));
                return;
            };
            let export = args.iter().any(|a| a.eq_ignore_ascii_case("EXPORT"));
            let params = match args.iter().position(|a| a.eq_ignore_ascii_case("WITH")) {
                Some(i) => args[i + 1..].to_vec(),
                None => Vec::new(),
            };
            out.push(Stmt::Proc { name: proc_name.clone(), export, params, loc });
        }
        ".ENDP" => out.push(Stmt::EndProc),
        ".PLACE" => {
            let (Some(mol_tok), Some(coord_tok)) = (args.first(), args.get(1)) else {
                diagnostics.push(Diagnostic::error(loc, "`.PLACE` needs a molecule literal and a coord"));
                return;
            };
            match (parse_typed_scalar(mol_tok), parse_place_axes(coord_tok)) {
                (Some(molecule), Some(axes)) => out.push(Stmt::Place { molecule, axes, loc }),
                _ => diagnostics.push(Diagnostic::error(
                    loc,
                    "`.PLACE` arguments must be `TYPE:VALUE` and a coord (vector, range, stepped range, or `*`)",
                )),
            }
        }
        ".REQUIRE" => match args.first() {
            Some(n) => out.push(Stmt::Require(n.clone(), loc)),
            None => diagnostics.push(Diagnostic::error(loc, "`.REQUIRE` needs a name")),
        },
        other => diagnostics.push(Diagnostic::error(loc, format!("unknown directive `{other}`"))),
    }
}

fn parse_vector(tok: &str) -> Option<Vec<i64>> {
    tok.split('|').map(parse_int).collect()
}

/// Parses a `.PLACE` coord: `|`-separated axes, each a plain int, a
/// range `a..b`, a stepped range `a:s:b`, or a wildcard `*` (§4.5 pass
/// 7).
fn parse_place_axis(tok: &str) -> Option<crate::asm::ast::PlaceAxis> {
    use crate::asm::ast::PlaceAxis;
    if tok == "*" {
        return Some(PlaceAxis::Wildcard);
    }
    if let Some((a, b)) = tok.split_once("..") {
        return Some(PlaceAxis::Range(parse_int(a)?, parse_int(b)?));
    }
    let parts: Vec<&str> = tok.split(':').collect();
    if parts.len() == 3 {
        return Some(PlaceAxis::Stepped(parse_int(parts[0])?, parse_int(parts[1])?, parse_int(parts[2])?));
    }
    Some(PlaceAxis::Single(parse_int(tok)?))
}

fn parse_place_axes(tok: &str) -> Option<Vec<crate::asm::ast::PlaceAxis>> {
    tok.split('|').map(parse_place_axis).collect()
}

fn parse_typed_scalar(tok: &str) -> Option<Molecule> {
    let (ty, val) = tok.split_once(':')?;
    Some(Molecule::new(parse_molecule_type(ty)?, parse_int(val)?))
}

fn parse_register(tok: &str) -> Option<RegisterId> {
    let rest = tok.strip_prefix('%')?;
    let upper = rest.to_ascii_uppercase();
    if let Some(n) = upper.strip_prefix("FPR") {
        return Some(RegisterId::Fpr(n.parse().ok()?));
    }
    if let Some(n) = upper.strip_prefix("DR") {
        return Some(RegisterId::Dr(n.parse().ok()?));
    }
    if let Some(n) = upper.strip_prefix("PR") {
        return Some(RegisterId::Pr(n.parse().ok()?));
    }
    if let Some(n) = upper.strip_prefix("LR") {
        return Some(RegisterId::Lr(n.parse().ok()?));
    }
    None
}

fn parse_operand(tok: &str) -> Operand {
    if let Some(reg) = parse_register(tok) {
        return Operand::Register(reg);
    }
    if let Some(m) = parse_typed_scalar(tok) {
        return Operand::Scalar(m);
    }
    if tok.contains('|') {
        if let Some(v) = parse_vector(tok) {
            return Operand::Vector(v);
        }
    }
    if let Some(v) = parse_int(tok) {
        return Operand::Scalar(Molecule::new(MoleculeType::Data, v));
    }
    Operand::Ident(tok.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::preprocess::FlatLine;

    fn line(text: &str) -> FlatItem {
        FlatItem::Line(FlatLine { file: "t.s".into(), line: 1, text: text.into() })
    }

    #[test]
    fn parses_instruction_with_typed_and_register_operands() {
        let mut diags = Diagnostics::default();
        let stmts = parse(vec![line("ADDI %DR0 DATA:5")], &mut diags);
        assert!(!diags.has_errors());
        let Stmt::Instruction(i) = &stmts[0] else { panic!("expected instruction") };
        assert_eq!(i.mnemonic, "ADDI");
        assert_eq!(i.operands[0], Operand::Register(RegisterId::Dr(0)));
        assert_eq!(i.operands[1], Operand::Scalar(Molecule::new(MoleculeType::Data, 5)));
    }

    #[test]
    fn parses_label_sharing_a_line() {
        let mut diags = Diagnostics::default();
        let stmts = parse(vec![line("LOOP: NOP")], &mut diags);
        assert!(matches!(stmts[0], Stmt::Label(ref n, _) if n == "LOOP"));
        assert!(matches!(stmts[1], Stmt::Instruction(ref i) if i.mnemonic == "NOP"));
    }

    #[test]
    fn parses_call_with_bindings() {
        let mut diags = Diagnostics::default();
        let stmts = parse(vec![line("CALL INC .WITH %DR3")], &mut diags);
        let Stmt::Instruction(i) = &stmts[0] else { panic!("expected instruction") };
        assert_eq!(i.operands[0], Operand::Ident("INC".into()));
        assert_eq!(i.with_bindings[0], Operand::Register(RegisterId::Dr(3)));
    }
}
