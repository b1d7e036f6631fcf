pub(crate) mod common;

mod engine;
mod ledger;
