//! chart-plugin-bus: coordination layer for chart plugins.
//!
//! Independently written plugins (cursor tracking, series focus, tooltip,
//! legend) share state through a typed reactive [`PluginBus`] instead of
//! referencing each other. Several charts attached to one bus stay in sync:
//! moving the pointer over one chart focuses the nearest series on all of
//! them.
//!
//! The charting engine itself is abstracted behind [`ChartHandle`];
//! [`HeadlessChart`] implements it without a drawing backend, and
//! [`ChartHost`] drives plugin lifecycle hooks the way a hosting UI component
//! would.

pub mod api;
pub mod bus;
pub mod core;
pub mod error;
pub mod extensions;
pub mod interaction;
pub mod telemetry;

pub use api::{ChartHost, ChartHostBuilder, OnCreateMeta, PersistedBusState};
pub use bus::{BusKey, BusPath, PluginBus, Subscription, TaskQueue};
pub use crate::core::{ChartHandle, ChartId, ChartRef, HeadlessChart};
pub use error::{PluginError, PluginResult};
pub use extensions::{ChartPlugin, PluginSpec, cursor, focus_series, legend, tooltip};
