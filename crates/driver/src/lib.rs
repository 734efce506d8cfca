// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container driver: the `Driver` trait, its docker-compose implementation,
//! and the bridge ingress reader.

pub mod bridge;
pub mod compose;
pub mod driver;
pub mod template;

pub use bridge::{BridgeEvent, BridgeListener};
pub use compose::ComposeDriver;
pub use driver::{Driver, DriverError, EngineHealth};
