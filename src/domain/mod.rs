//! Domain types and the ports through which the adapter reaches its collaborators.

pub mod callback;
pub mod customer;
pub mod event;
pub mod gateway;
pub mod money;
pub mod order;
pub mod ports;
