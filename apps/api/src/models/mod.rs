pub mod candidate;
pub mod organisation;
