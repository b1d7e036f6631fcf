//! Sticker linkage: joins stickers, vehicles, and violations by plate and owner,
//! and tracks sticker deliveries and misuse investigations.

pub mod domain;
pub(crate) mod index;
pub mod service;

pub use domain::{
    DeliveryStatus, MisuseReport, MisuseStatus, NewDelivery, NewMisuseReport, OwnerLookup,
    PlateLookup, ReconcileReport, Sticker, StickerCheck, StickerDelivery, StickerLink,
    StickerStatus, StickerValidation,
};
pub use service::StickerLinkageIndex;
