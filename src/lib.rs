pub mod chains;
pub mod charts;
pub mod config;
pub mod delivery;
pub mod html;
pub mod plots;
pub mod reports;
pub mod startup;

#[cfg(test)]
mod testing;
