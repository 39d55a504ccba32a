//! The tick-by-tick interpreter/scheduler (§5, §6 Runtime API).
//!
//! A `Runtime` owns the [`World`], the set of living [`Organism`]s, and
//! the single seeded [`Rng`] stream. Each [`Runtime::tick`] is an atomic
//! fetch -> plan -> arbitrate -> commit -> advance step applied to every
//! living organism in ascending id order, matching the "single-threaded
//! cooperative" scheduling model.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::coord::Coord;
use crate::rng::Rng;
use crate::vm::error::InstructionFault;
use crate::vm::isa::{self, Effect, Opcode};
use crate::vm::organism::{Organism, OrganismId, RegValue};
use crate::vm::program::ProgramArtifact;
use crate::world::{EnvironmentProperties, World};

/// Runtime-wide tunables that the source material leaves as "a
/// configured value" rather than a hardcoded constant.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub instruction_failure_penalty: i64,
    pub max_ds_depth: usize,
    pub max_ls_depth: usize,
    pub max_cs_depth: usize,
    /// Clamp applied to `ER` after a `PEEK` of an `ENERGY` cell would
    /// overflow it (§9 open question: "clamp or wrap? ... clamping to a
    /// configured max"). `i64::MAX` effectively disables clamping.
    pub max_organism_energy: i64,
    /// The flat part of `FORK`'s cost formula `fork_base_cost +
    /// child_energy` (§4.3).
    pub fork_base_cost: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            instruction_failure_penalty: 1,
            max_ds_depth: 64,
            max_ls_depth: 64,
            max_cs_depth: 32,
            max_organism_energy: 1_000_000,
            fork_base_cost: 10,
        }
    }
}

/// One organism's row in [`Snapshot`] (§6 Runtime API).
#[derive(Debug, Clone, PartialEq)]
pub struct OrganismSnapshot {
    pub id: OrganismId,
    pub parent_id: OrganismId,
    pub birth_tick: u64,
    pub program_id: String,
    pub initial_position: Coord,
    pub ip: Coord,
    pub dv: Coord,
    pub dps: Vec<Coord>,
    pub active_dp_index: usize,
    pub er: i64,
    pub drs: Vec<RegValue>,
    pub prs: Vec<RegValue>,
    pub fprs: Vec<RegValue>,
    pub lrs: Vec<Coord>,
    pub data_stack: Vec<RegValue>,
    pub location_stack: Vec<Coord>,
    pub call_stack_depth: usize,
    pub dead: bool,
    pub instruction_failed: bool,
    pub failure_reason: Option<InstructionFault>,
}

/// One occupied cell in [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSnapshot {
    pub coord_index: usize,
    pub molecule_as_int: i64,
    pub owner_id: u64,
}

/// Immutable per-tick view of the whole simulation, the serialization
/// contract the persistence collaborator reads (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u64,
    pub organisms: Vec<OrganismSnapshot>,
    pub cells: Vec<(Coord, CellSnapshot)>,
}

struct PlannedInstruction {
    id: OrganismId,
    effect: Effect,
}

/// Owns the world, the living organisms, and the RNG stream; advances
/// the simulation one tick at a time.
pub struct Runtime {
    world: World,
    organisms: BTreeMap<OrganismId, Organism>,
    programs: BTreeMap<String, ProgramArtifact>,
    next_id: OrganismId,
    tick: u64,
    rng: Rng,
    config: RuntimeConfig,
}

impl Runtime {
    #[must_use]
    pub fn new(env_props: &EnvironmentProperties, seed: Option<u64>, config: RuntimeConfig) -> Self {
        Self {
            world: World::new(env_props),
            organisms: BTreeMap::new(),
            programs: BTreeMap::new(),
            next_id: 1,
            tick: 0,
            rng: Rng::new(seed.unwrap_or(0)),
            config,
        }
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    /// Stamps `artifact`'s machine code and initial world objects into
    /// the world at `start_coord` (owner = the new organism's id) and
    /// creates the organism there, `dv` defaulting to `+axis0`.
    pub fn place(&mut self, artifact: ProgramArtifact, start_coord: Coord, initial_energy: i64) -> OrganismId {
        let id = self.next_id;
        self.next_id += 1;

        for (relative, molecule) in &artifact.machine_code_layout {
            let absolute = self.world.wrap(&(&start_coord + relative));
            self.world.set(&absolute, *molecule, id);
        }
        for (relative, molecule) in &artifact.initial_world_objects {
            let absolute = self.world.wrap(&(&start_coord + relative));
            self.world.set(&absolute, *molecule, id);
        }

        let dims = start_coord.dims();
        let dv = Coord::unit(dims, 0, true);
        let organism = Organism::new(
            id,
            0,
            self.tick,
            artifact.program_id.clone(),
            start_coord,
            dv,
            initial_energy,
            self.config.max_ds_depth,
            self.config.max_ls_depth,
            self.config.max_cs_depth,
        );
        debug!(organism = id, energy = initial_energy, "placed organism");
        self.programs.entry(artifact.program_id.clone()).or_insert(artifact);
        self.organisms.insert(id, organism);
        id
    }

    /// Advances the simulation by one tick (§5).
    pub fn tick(&mut self) {
        let living_ids: Vec<OrganismId> = self.organisms.keys().copied().collect();
        let dims = self.world.shape().len();

        let mut plans = Vec::with_capacity(living_ids.len());
        for id in &living_ids {
            let organism = self.organisms.get_mut(id).expect("id came from this map's keys");
            organism.ip_before_fetch = organism.ip.clone();
            organism.dv_before_fetch = organism.dv.clone();
            organism.skip_ip_advance = false;
            organism.instruction_failed = false;
            organism.failure_reason = None;

            let op = isa::decode(self.world.get(&organism.ip)).unwrap_or(Opcode::Nop);
            let ar = isa::arity(op, dims);
            let mut args = Vec::with_capacity(ar);
            let mut cursor = organism.ip.clone();
            for _ in 0..ar {
                cursor = self.world.wrap(&(&cursor + &organism.dv));
                args.push(self.world.get(&cursor));
            }

            let Some(artifact) = self.programs.get(&organism.program_id) else {
                warn!(organism = id, "organism references an unregistered program artifact");
                continue;
            };

            let effect = isa::execute(
                op,
                organism,
                &self.world,
                &args,
                &mut self.rng,
                self.config.instruction_failure_penalty,
                self.config.fork_base_cost,
                artifact,
            );
            trace!(organism = id, opcode = op.mnemonic(), "planned instruction");
            plans.push(PlannedInstruction { id: *id, effect });
        }

        let winners = self.arbitrate(&mut plans);

        for plan in &plans {
            let organism = self.organisms.get_mut(&plan.id).expect("id came from this map's keys");
            let won = winners.get(&plan.id).copied().unwrap_or(true);

            if let Some(write) = &plan.effect.world_write {
                if won {
                    self.world.set(&write.coord, write.molecule, write.owner);
                }
            }

            let base = if won { plan.effect.base_cost } else { 0 };
            organism.er -= plan.effect.pre_conflict_cost + base;
            if self.config.max_organism_energy > 0 {
                organism.er = organism.er.min(self.config.max_organism_energy);
            }

            if !won {
                organism.fail(InstructionFault::WriteConflictLost);
            }

            if !organism.skip_ip_advance {
                let op = isa::decode(self.world.get(&organism.ip_before_fetch)).unwrap_or(Opcode::Nop);
                let step = 1 + isa::arity(op, dims) as i64;
                organism.ip = self
                    .world
                    .wrap(&(&organism.ip_before_fetch + &organism.dv_before_fetch.scaled(step)));
            }
        }

        let mut spawned = Vec::new();
        for plan in &plans {
            if let Some(fork) = &plan.effect.fork {
                let parent_program = self
                    .organisms
                    .get(&plan.id)
                    .map(|o| o.program_id.clone())
                    .unwrap_or_default();
                spawned.push((plan.id, parent_program, fork.child_energy, fork.child_ip.clone(), fork.child_dv.clone()));
            }
        }
        for (parent_id, program_id, child_energy, child_ip, child_dv) in spawned {
            let id = self.next_id;
            self.next_id += 1;
            let organism = Organism::new(
                id,
                parent_id,
                self.tick,
                program_id,
                child_ip,
                child_dv,
                child_energy,
                self.config.max_ds_depth,
                self.config.max_ls_depth,
                self.config.max_cs_depth,
            );
            debug!(organism = id, parent = parent_id, "forked organism");
            self.organisms.insert(id, organism);
        }

        for organism in self.organisms.values_mut() {
            if organism.er <= 0 {
                organism.dead = true;
            }
        }
        self.organisms.retain(|_, o| !o.dead);

        self.tick += 1;
    }

    /// Deterministic tie-break for same-cell writes this tick: lowest
    /// organism id wins (§9 open question, resolved; an RNG draw is
    /// reserved for a future n-way extension but unreachable while ids
    /// already totally order the candidates).
    fn arbitrate(&mut self, plans: &mut [PlannedInstruction]) -> BTreeMap<OrganismId, bool> {
        let mut by_cell: BTreeMap<Coord, Vec<OrganismId>> = BTreeMap::new();
        for plan in plans.iter() {
            if let Some(write) = &plan.effect.world_write {
                by_cell.entry(write.coord.clone()).or_default().push(plan.id);
            }
        }

        let mut winners = BTreeMap::new();
        for (_, mut contenders) in by_cell {
            if contenders.len() == 1 {
                winners.insert(contenders[0], true);
                continue;
            }
            contenders.sort_unstable();
            let winner = contenders[0];
            winners.insert(winner, true);
            for loser in &contenders[1..] {
                winners.insert(*loser, false);
            }
        }
        winners
    }

    /// Returns a serializable snapshot of the current simulation state
    /// (§6 Runtime API).
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let organisms = self
            .organisms
            .values()
            .map(|o| OrganismSnapshot {
                id: o.id,
                parent_id: o.parent_id,
                birth_tick: o.birth_tick,
                program_id: o.program_id.clone(),
                initial_position: o.initial_ip.clone(),
                ip: o.ip.clone(),
                dv: o.dv.clone(),
                dps: o.dps.clone(),
                active_dp_index: o.active_dp_index,
                er: o.er,
                drs: o.dr.to_vec(),
                prs: o.pr.to_vec(),
                fprs: o.fpr.to_vec(),
                lrs: o.lr.to_vec(),
                data_stack: o.ds.iter().cloned().collect(),
                location_stack: o.ls.iter().cloned().collect(),
                call_stack_depth: o.cs.len(),
                dead: o.dead,
                instruction_failed: o.instruction_failed,
                failure_reason: o.failure_reason,
            })
            .collect();

        let cells = self
            .world
            .non_empty_cells()
            .enumerate()
            .map(|(i, (coord, molecule, owner))| {
                (
                    coord,
                    CellSnapshot {
                        coord_index: i,
                        molecule_as_int: molecule.to_int(),
                        owner_id: owner,
                    },
                )
            })
            .collect();

        Snapshot {
            tick: self.tick,
            organisms,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{Molecule, MoleculeType};
    use crate::vm::isa::Opcode;
    use std::collections::BTreeMap as Map;

    fn artifact_of(layout: Map<Coord, Molecule>) -> ProgramArtifact {
        ProgramArtifact {
            program_id: "test".into(),
            sources: Map::new(),
            machine_code_layout: layout,
            initial_world_objects: Map::new(),
            label_address_to_name: Map::new(),
            register_alias_map: Map::new(),
            proc_name_to_param_names: Map::new(),
            call_site_bindings: Map::new(),
            linear_address_to_coord: Map::new(),
            source_map: Map::new(),
        }
    }

    fn code(op: Opcode, args: &[Molecule]) -> Vec<Molecule> {
        let mut v = vec![Molecule::new(MoleculeType::Code, op.id() as i64)];
        v.extend_from_slice(args);
        v
    }

    #[test]
    fn arithmetic_scenario() {
        let env = EnvironmentProperties {
            world_shape: vec![16],
            toroidal: true,
        };
        let mut layout = Map::new();
        let mut cells = Vec::new();
        cells.extend(code(
            Opcode::Seti,
            &[Molecule::new(MoleculeType::Data, 0), Molecule::new(MoleculeType::Data, 10)],
        ));
        cells.extend(code(
            Opcode::Addi,
            &[Molecule::new(MoleculeType::Data, 0), Molecule::new(MoleculeType::Data, 5)],
        ));
        for (i, m) in cells.into_iter().enumerate() {
            layout.insert(Coord(vec![i as i64]), m);
        }

        let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
        let id = rt.place(artifact_of(layout), Coord(vec![0]), 100);
        rt.tick();
        rt.tick();

        let dr0 = rt.organism(id).unwrap().dr[0].as_scalar().unwrap();
        assert_eq!(dr0.value(), 15);
    }

    #[test]
    fn toroidal_wrap_scenario() {
        let env = EnvironmentProperties {
            world_shape: vec![20, 5],
            toroidal: true,
        };
        let mut layout = Map::new();
        layout.insert(Coord(vec![0, 0]), Molecule::new(MoleculeType::Code, Opcode::Nop.id() as i64));
        let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
        let id = rt.place(artifact_of(layout), Coord(vec![19, 0]), 100);
        rt.organisms.get_mut(&id).unwrap().dv = Coord(vec![1, 0]);
        rt.tick();
        assert_eq!(rt.organism(id).unwrap().ip, Coord(vec![0, 0]));
    }

    #[test]
    fn call_ret_round_trips_a_with_binding() {
        let mut sources = Map::new();
        sources.insert(
            "main.s".to_string(),
            vec![
                ".PROC INC WITH A".to_string(),
                "ADDI %FPR0 DATA:1".to_string(),
                "RET".to_string(),
                ".ENDP".to_string(),
                "SETI %DR3 DATA:5".to_string(),
                "CALL INC .WITH %DR3".to_string(),
            ],
        );
        let env = EnvironmentProperties {
            world_shape: vec![64],
            toroidal: true,
        };
        let artifact = crate::asm::compile(&sources, "main.s", &env).expect("compiles");

        let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
        let id = rt.place(artifact, Coord(vec![0]), 1000);
        for _ in 0..8 {
            rt.tick();
        }

        let dr3 = rt.organism(id).unwrap().dr[3].as_scalar().unwrap();
        assert_eq!(dr3.value(), 6, "CALL copies DR3 into FPR0, ADDI bumps it, RET copies it back out");
    }
}
