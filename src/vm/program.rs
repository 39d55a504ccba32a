//! `ProgramArtifact`: the assembler's immutable output, the runtime's input (§3.4).

use std::collections::BTreeMap;

use crate::coord::Coord;
use crate::molecule::Molecule;
use crate::vm::organism::RegisterId;

/// `(file, line)` — used by `source_map` for debug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

/// The compile-time output consumed by the runtime. Immutable: once
/// built, nothing in this crate mutates it. Re-running the pipeline on
/// the same sources and `EnvironmentProperties` yields a byte-identical
/// artifact (same `program_id`, §4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramArtifact {
    pub program_id: String,
    pub sources: BTreeMap<String, Vec<String>>,
    /// Relative n-D coord -> packed molecule (always CODE or DATA).
    pub machine_code_layout: BTreeMap<Coord, Molecule>,
    /// Relative n-D coord -> molecule placed by `.PLACE`.
    pub initial_world_objects: BTreeMap<Coord, Molecule>,
    pub label_address_to_name: BTreeMap<i64, String>,
    pub register_alias_map: BTreeMap<String, RegisterId>,
    pub proc_name_to_param_names: BTreeMap<String, Vec<String>>,
    /// Linear address of a `CALL` with `.WITH` -> ordered caller register ids.
    pub call_site_bindings: BTreeMap<i64, Vec<RegisterId>>,
    pub linear_address_to_coord: BTreeMap<i64, Coord>,
    pub source_map: BTreeMap<i64, SourceLocation>,
}

impl ProgramArtifact {
    #[must_use]
    pub fn coord_to_linear_address(&self, coord: &Coord) -> Option<i64> {
        self.linear_address_to_coord
            .iter()
            .find(|(_, c)| *c == coord)
            .map(|(addr, _)| *addr)
    }
}
