//! JMD Tiffins Core - Shared types and order rules.
//!
//! This crate provides the types used across all JMD Tiffins components:
//! - `admin` - Staff dashboard and the public same-day order form
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The business rules that decide *when* an order is
//! delivered and *which* checkout step comes next live here so they can be
//! tested without a server.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, and status enums
//! - [`delivery`] - Delivery-date resolution with the 21:00 cutoff
//! - [`checkout`] - Order-payment workflow state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod delivery;
pub mod types;

pub use checkout::{CheckoutEvent, CheckoutState, TransitionError};
pub use delivery::{DeliverySchedule, business_offset, local_today, resolve_delivery};
pub use types::*;
