pub mod availability;
pub mod billing;
pub mod calendar;
pub mod reconciler;
pub mod reservation;
