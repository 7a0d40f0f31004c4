pub mod graph;
pub mod pathfinder;
