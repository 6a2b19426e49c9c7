pub mod extract;
pub mod shapes;
pub mod tokenize;
