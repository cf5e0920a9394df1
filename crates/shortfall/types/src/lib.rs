//! Domain model for the shortage-request workflow.
//!
//! A shortage request is one missing production item moving through a
//! fixed five-role pipeline: Logistics reports it, Planning schedules it,
//! Customer Service produces or cuts it, Production manufactures it, and
//! Logistics collects the finished goods. This crate holds the entities
//! the pipeline operates on:
//! - the request itself, its status enum, and the milestone audit trail
//! - product master data (unit weights resolved at report time)
//! - operator accounts and their roles
//! - the error taxonomy shared by every workflow operation

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod account;
mod errors;
mod product;
mod request;

pub use account::{Role, User};
pub use errors::{ShortfallError, ShortfallResult};
pub use product::Product;
pub use request::{
    AuditEntry, AuditTrail, Criticality, Milestone, RequestId, RequestStatus, ShortageRequest,
};
