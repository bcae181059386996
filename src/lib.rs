//! Crewchat: an HR chat service. A language model answers employee
//! questions grounded in the employee manual and registers leave and
//! billable hours through tool calls.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod hours;
pub mod llm;
pub mod orchestrator;
pub mod registration;
pub mod retriever;
pub mod store;
pub mod tools;
