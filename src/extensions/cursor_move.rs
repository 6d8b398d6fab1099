use std::rc::Rc;

use crate::core::{ChartRef, SeriesDataOptions, SeriesDatum, series_data};
use crate::extensions::cursor::{CursorSnapshot, cursor_snapshot};
use crate::extensions::plugins::ChartPlugin;

pub const CURSOR_MOVE_PLUGIN_ID: &str = "cursor-move";

/// Payload handed to cursor-move callbacks.
pub struct CursorMoveParams<'a> {
    pub chart: &'a ChartRef,
    pub cursor: CursorSnapshot,
    pub series: Vec<SeriesDatum>,
}

pub type CursorMoveCallback = Rc<dyn Fn(&CursorMoveParams<'_>)>;

/// Calls back on every cursor move that lands inside the data.
///
/// Works without a bus.
pub struct CursorMovePlugin {
    callback: CursorMoveCallback,
}

impl CursorMovePlugin {
    #[must_use]
    pub fn new(callback: impl Fn(&CursorMoveParams<'_>) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }
}

impl ChartPlugin for CursorMovePlugin {
    fn id(&self) -> &str {
        CURSOR_MOVE_PLUGIN_ID
    }

    fn set_cursor(&mut self, chart: &ChartRef) {
        let Some(cursor) = cursor_snapshot(chart.as_ref()) else {
            return;
        };
        let series = series_data(chart.as_ref(), &SeriesDataOptions::default());
        (self.callback)(&CursorMoveParams {
            chart,
            cursor,
            series,
        });
    }
}
