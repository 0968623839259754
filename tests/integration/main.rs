//! Integration tests for the price-action betting core.
//!
//! Deterministic end-to-end scenarios: a mock price source and a mock
//! ledger stand in for the external collaborators, the real feed,
//! registry, engine, and scheduler run in between.

mod mock_feed;
mod mock_ledger;
