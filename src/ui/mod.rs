//! egui widgets drawn by [`crate::app::NmrPlotApp`].

pub mod panels;
pub mod plot;
