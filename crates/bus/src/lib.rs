// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant-scoped event bus with durable replay, plus the NATS bridge that
//! lets the worker plane forward bridge-observed events to the
//! authoritative writer in the control plane.

pub mod bus;
pub mod nats;

pub use bus::{Attachment, Bus, Delivery, CHANNEL_CAPACITY, DEFAULT_REPLAY, MAX_REPLAY};
pub use nats::{BusNatsError, Publisher, Responder};
