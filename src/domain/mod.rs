pub mod benchmark;
pub mod normalize;
pub mod solver;
pub mod solver_factory;
pub mod solvers;
pub mod upload;
pub mod validate;
