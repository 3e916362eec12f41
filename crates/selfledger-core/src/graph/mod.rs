//! Causal meme-graph and concept-graph projections.

mod commitments;
mod concept;
mod ctl;
mod meme;

pub use commitments::extract_commitments;
pub use concept::{lift_concept_edges, Bindings, ConceptEdge};
pub use ctl::{rebuild_ctl_from_projections, ConceptGraph, ConceptGraphState};
pub use meme::{Direction, GraphStats, MemeGraph, TRACKED_KINDS};
