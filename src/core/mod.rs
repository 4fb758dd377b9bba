pub mod experience;
pub mod market_hours;
pub mod moves;
pub mod position_planner;
pub mod timing;
