pub mod assess;
pub mod risk_display;
pub mod simulate;
