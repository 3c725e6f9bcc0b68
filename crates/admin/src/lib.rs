//! JMD Tiffins dashboard library.
//!
//! This crate provides the dashboard and the public order form as a
//! library, allowing the router to be tested and reused by the CLI.
//!
//! # Surfaces
//!
//! - Staff dashboard (login required): orders, customers, menu, today's menu
//! - Public same-day order form with optional Razorpay payment
//! - Razorpay webhook receiver
//!
//! A background [`services::Reconciler`] finishes payments whose paid
//! status could not be written during the request.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
