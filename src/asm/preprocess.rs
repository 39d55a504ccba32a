//! Macro expansion (`.MACRO/.ENDM`) and include resolution (`.INCLUDE`)
//! (§4.5 passes 2–3), plus `.DEFINE` text substitution. Flattens the
//! whole source set into a single ordered stream the parser consumes,
//! with `IncludeBegin`/`IncludeEnd` markers bracketing an included
//! region so the layout pass can restore `.DIR` across it.

use std::collections::{BTreeMap, VecDeque};

use crate::asm::diagnostics::{Diagnostic, Diagnostics};
use crate::asm::lexer::tokenize;
use crate::vm::program::SourceLocation;

pub struct FlatLine {
    pub file: String,
    pub line: usize,
    pub text: String,
}

pub enum FlatItem {
    Line(FlatLine),
    IncludeBegin,
    IncludeEnd,
}

enum QueueItem {
    Line { file: String, line: usize, text: String },
    IncludeEnd,
}

struct MacroDef {
    params: Vec<String>,
    body: Vec<(usize, String)>,
}

pub fn flatten(sources: &BTreeMap<String, Vec<String>>, entry: &str, diagnostics: &mut Diagnostics) -> Vec<FlatItem> {
    let mut macros: BTreeMap<String, MacroDef> = BTreeMap::new();
    let mut defines: BTreeMap<String, String> = BTreeMap::new();
    let mut out = Vec::new();
    let mut queue: VecDeque<QueueItem> = VecDeque::new();
    let mut include_stack: Vec<String> = vec![entry.to_string()];
    let mut capturing: Option<(String, Vec<String>, Vec<(usize, String)>)> = None;

    push_file(&mut queue, sources, entry, diagnostics);

    while let Some(item) = queue.pop_front() {
        let QueueItem::Line { file, line, text } = item else {
            include_stack.pop();
            out.push(FlatItem::IncludeEnd);
            continue;
        };

        let loc = SourceLocation { file: file.clone(), line };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let tokens = tokenize(trimmed);
        if tokens.is_empty() {
            continue;
        }

        if let Some((macro_name, params, mut body)) = capturing.take() {
            if tokens[0].eq_ignore_ascii_case(".ENDM") {
                macros.insert(macro_name.to_ascii_uppercase(), MacroDef { params, body });
            } else {
                body.push((line, trimmed.to_string()));
                capturing = Some((macro_name, params, body));
            }
            continue;
        }

        let head = tokens[0].to_ascii_uppercase();
        match head.as_str() {
            ".MACRO" => {
                let macro_name = tokens.get(1).cloned().unwrap_or_default();
                let params = tokens[2..].to_vec();
                capturing = Some((macro_name, params, Vec::new()));
            }
            ".DEFINE" => {
                if tokens.len() >= 3 {
                    defines.insert(tokens[1].clone(), tokens[2].clone());
                } else {
                    diagnostics.push(Diagnostic::error(loc, "`.DEFINE` needs a name and a value"));
                }
            }
            ".INCLUDE" => {
                let Some(path) = tokens.get(1).cloned() else {
                    diagnostics.push(Diagnostic::error(loc, "`.INCLUDE` needs a path"));
                    continue;
                };
                if include_stack.contains(&path) {
                    diagnostics.push(Diagnostic::error(loc, format!("circular include of `{path}`")));
                    continue;
                }
                let Some(included) = sources.get(&path) else {
                    diagnostics.push(Diagnostic::error(loc, format!("unreachable include `{path}`")));
                    continue;
                };
                out.push(FlatItem::IncludeBegin);
                include_stack.push(path.clone());
                let mut prefix = Vec::with_capacity(included.len() + 1);
                for (i, raw) in included.iter().enumerate() {
                    prefix.push(QueueItem::Line { file: path.clone(), line: i + 1, text: raw.clone() });
                }
                prefix.push(QueueItem::IncludeEnd);
                for queued in prefix.into_iter().rev() {
                    queue.push_front(queued);
                }
            }
            _ => {
                if let Some(def) = macros.get(&head) {
                    if tokens.len() - 1 != def.params.len() {
                        diagnostics.push(Diagnostic::error(
                            loc,
                            format!(
                                "macro `{}` expects {} argument(s), got {}",
                                tokens[0],
                                def.params.len(),
                                tokens.len() - 1
                            ),
                        ));
                        continue;
                    }
                    let args = &tokens[1..];
                    let mut expansion = Vec::with_capacity(def.body.len());
                    for (body_line, body_text) in &def.body {
                        let substituted = substitute_tokens(body_text, &def.params, args);
                        expansion.push(QueueItem::Line {
                            file: file.clone(),
                            line: *body_line,
                            text: substituted,
                        });
                    }
                    for queued in expansion.into_iter().rev() {
                        queue.push_front(queued);
                    }
                } else {
                    let substituted = substitute_defines(trimmed, &defines);
                    out.push(FlatItem::Line(FlatLine { file, line, text: substituted }));
                }
            }
        }
    }

    if let Some((macro_name, ..)) = capturing {
        diagnostics.push(Diagnostic::error(
            SourceLocation { file: entry.to_string(), line: 0 },
            format!("`.MACRO {macro_name}` missing `.ENDM`"),
        ));
    }

    out
}

fn push_file(queue: &mut VecDeque<QueueItem>, sources: &BTreeMap<String, Vec<String>>, path: &str, diagnostics: &mut Diagnostics) {
    match sources.get(path) {
        Some(lines) => {
            for (i, raw) in lines.iter().enumerate() {
                queue.push_back(QueueItem::Line { file: path.to_string(), line: i + 1, text: raw.clone() });
            }
        }
        None => diagnostics.push(Diagnostic::error(
            SourceLocation { file: path.to_string(), line: 0 },
            format!("entry file `{path}` not found"),
        )),
    }
}

fn substitute_tokens(line: &str, params: &[String], args: &[String]) -> String {
    tokenize(line)
        .into_iter()
        .map(|tok| match params.iter().position(|p| p == &tok) {
            Some(i) => args[i].clone(),
            None => tok,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn substitute_defines(line: &str, defines: &BTreeMap<String, String>) -> String {
    if defines.is_empty() {
        return line.to_string();
    }
    tokenize(line)
        .into_iter()
        .map(|tok| defines.get(&tok).cloned().unwrap_or(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(str::to_string).collect()
    }

    #[test]
    fn macro_expands_with_substitution() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "main.s".to_string(),
            lines(".MACRO INC R\nADDI R DATA:1\n.ENDM\nINC %DR0"),
        );
        let mut diags = Diagnostics::default();
        let flat = flatten(&sources, "main.s", &mut diags);
        assert!(!diags.has_errors());
        let texts: Vec<_> = flat
            .into_iter()
            .filter_map(|i| match i {
                FlatItem::Line(l) => Some(l.text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["ADDI %DR0 DATA:1".to_string()]);
    }

    #[test]
    fn include_is_bracketed() {
        let mut sources = BTreeMap::new();
        sources.insert("main.s".to_string(), lines(".INCLUDE \"helper.s\"\nNOP"));
        sources.insert("helper.s".to_string(), lines("NOP"));
        let mut diags = Diagnostics::default();
        let flat = flatten(&sources, "main.s", &mut diags);
        assert!(!diags.has_errors());
        assert!(matches!(flat[0], FlatItem::IncludeBegin));
        assert!(matches!(flat[2], FlatItem::IncludeEnd));
    }
}
