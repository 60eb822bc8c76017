//! Request-body validation against the schema's field definitions.

mod validation;
pub use validation::RequestValidator;
