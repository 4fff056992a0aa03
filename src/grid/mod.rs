pub mod indexer;
pub mod lattice;
