pub mod posting;
pub mod profile;
