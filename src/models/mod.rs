//! Row, period and aggregate types shared by the analytics services.

pub mod analytics;
pub mod period;
pub mod record;
pub mod table;

