//! Evochora: an n-dimensional artificial-life substrate. Programs are
//! assembled into [`vm::program::ProgramArtifact`]s, placed into a
//! [`world::World`], and executed by [`interpreter::Runtime`] one
//! deterministic tick at a time.

pub mod asm;
pub mod coord;
pub mod interpreter;
pub mod molecule;
pub mod rng;
pub mod vm;
pub mod world;

pub use coord::Coord;
pub use interpreter::{Runtime, RuntimeConfig, Snapshot};
pub use molecule::{Molecule, MoleculeType};
pub use vm::organism::{Organism, OrganismId};
pub use vm::program::ProgramArtifact;
pub use world::{EnvironmentProperties, World};
