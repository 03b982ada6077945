mod change_generator;

pub use change_generator::{ChangeGenerator, GeneratorConfig, random_quote};
