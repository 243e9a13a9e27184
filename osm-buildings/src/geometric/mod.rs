pub mod building;
pub mod collection;
pub mod energy;
pub mod node_heights;
pub mod statistics;
