//! Vehicle registry: CRUD, gate entries, suspension, and derived risk classification.

pub mod classification;
pub mod domain;
mod export;
pub(crate) mod import;
pub mod service;

pub use classification::{
    recompute_classification, tally_by_plate, ClassificationPolicy, ViolationTally,
};
pub use domain::{
    GateEntry, GateInfo, NewVehicle, NewVehicleImage, OwnerCategory, Vehicle, VehicleImage,
    VehiclePatch, VehicleSearch, VehicleSource, VehicleStatus,
};
pub use import::ImportError;
pub use service::VehicleRegistry;
