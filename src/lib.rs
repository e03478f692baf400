//! packtrace: battery asset lifecycle and compliance engine
//!
//! Tracks battery packs from cell lot through assembly, provisioning, EOL
//! qualification, inventory, dispatch, custody transfer and warranty, with
//! gated state transitions, append-only audit trails and a read-only
//! compliance rule engine over the entity graph.

pub mod cli;
pub mod core;
pub mod entities;
