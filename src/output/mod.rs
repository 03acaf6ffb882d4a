//! Output artifacts: names, placement, sidecars and run summaries.

mod in_flight;
mod naming;
mod placement;
pub mod progress;
mod sidecar;
mod summary;

pub use in_flight::{
    cleanup_in_flight, partial_path, register_in_flight, unregister_all, unregister_in_flight,
};
pub use naming::{
    file_stem, photo_file_name, sidecar_file_name, truncate_component, with_counter,
};
pub use placement::{ArtifactReservation, destination_dir};
pub use sidecar::{SidecarRecord, read_sidecar};
pub use summary::{FailureRecord, RunSummary};
