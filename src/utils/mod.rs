pub mod deadline;
pub mod resolver;
pub mod salary_cache;
