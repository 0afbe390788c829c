pub mod prelude;

pub mod tools;
