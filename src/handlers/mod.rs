//! Request handlers invoked by the dispatcher: entity CRUD and custom routes.

pub mod custom;
pub mod entity;
