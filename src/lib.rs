//! Transport & Traffic Simulation Engine
//!
//! A deterministic road-network traffic engine: graph, A* route planning
//! with caching, car-following vehicle dynamics, signal and ramp-meter
//! control, and congestion modeling, orchestrated once per host tick.

pub mod engine;
