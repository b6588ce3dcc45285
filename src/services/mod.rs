pub mod calendar;
pub mod lifecycle;
