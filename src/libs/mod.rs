pub mod gene;
pub mod homology;
pub mod io;
pub mod render;
pub mod shuffle;
pub mod synteny;
