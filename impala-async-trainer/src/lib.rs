//! A thread-based actor/predictor/trainer/coordinator scheduler
//! implementing the IMPALA pattern over the [`impala_core::Env`] and
//! [`impala_core::Model`] trait boundary.
//!
//! The scheduler is built from `std::thread`/`std::sync::{Mutex,
//! Condvar}` rather than an async runtime or channel crate: several of
//! its wait conditions are threshold waits ("block until this queue
//! holds at least `MIN` entries, or exit was requested"), which map
//! directly onto [`std::sync::Condvar::wait_while`] but not onto a
//! channel's `recv()`.
//!
//! [`Server`] is the entry point: [`Server::build`] validates an
//! [`impala_core::ServerConfig`] and spawns the actor/predictor/trainer
//! population, and [`Server::run`] spawns the coordinator, blocks until
//! it reaches a training-step target, and shuts the whole population
//! down cleanly.
mod actor;
mod batch;
mod coordinator;
mod parking;
mod predictor;
mod queue;
mod server;
mod trainer;

pub use server::Server;
