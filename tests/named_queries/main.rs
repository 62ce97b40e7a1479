//! Named query suite: result metadata invalidation and persistence

#[path = "../common/mod.rs"]
mod common;

mod covariance;
mod invalidation;
mod persistence;
