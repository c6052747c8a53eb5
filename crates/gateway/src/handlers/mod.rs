//! API handlers module
//!
//! One module per resource. A handler parses the scope and body, runs the
//! input's rules, calls one service operation and writes the response.

pub mod assignment;
pub mod batch;
pub mod course;
pub mod discussion;
pub mod enquiry;
pub mod feedback;
pub mod health;
pub mod interview;
pub mod notification;
pub mod session;
pub mod talent;
pub mod waiting_list;
